//! Layer naming scope.
//!
//! Model construction asks the scope for unique layer names. The scope is
//! owned by whoever builds models (the trial driver) and is reset between
//! trials, so every trial's layers are named from the same base
//! (`convolution2d_1`, `batchnormalization_1`, ...) instead of continuing to
//! count upward from the previous model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix -> counter table used to generate unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameScope {
    counters: BTreeMap<String, u32>,
}

impl NameScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `prefix` and return its new value.
    ///
    /// The first id handed out for a prefix is 1.
    pub fn next_id(&mut self, prefix: &str) -> u32 {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Generate a unique name of the form `{prefix}_{n}`.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        let id = self.next_id(prefix);
        format!("{prefix}_{id}")
    }

    /// Current counter value for a prefix, if it was ever used.
    pub fn get(&self, prefix: &str) -> Option<u32> {
        self.counters.get(prefix).copied()
    }

    /// Set every tracked counter back to zero. Keys are kept.
    pub fn reset(&mut self) {
        for value in self.counters.values_mut() {
            *value = 0;
        }
    }

    /// True when every tracked counter reads zero.
    pub fn is_reset(&self) -> bool {
        self.counters.values().all(|v| *v == 0)
    }

    /// Iterate over `(prefix, counter)` pairs in prefix order.
    pub fn counters(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
