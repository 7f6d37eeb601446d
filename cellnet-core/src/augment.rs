//! Data augmentation switches and the generator settings they imply.

use serde::{Deserialize, Serialize};

/// Which random transformations to apply to training windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationFlags {
    #[serde(default = "default_true")]
    pub rotate: bool,
    #[serde(default = "default_true")]
    pub flip: bool,
    #[serde(default)]
    pub shear: bool,
}

impl Default for AugmentationFlags {
    fn default() -> Self {
        Self {
            rotate: true,
            flip: true,
            shear: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Concrete image-generator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    pub rotation_range: f64,
    pub shear_range: f64,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
}

impl AugmentationFlags {
    pub fn generator_params(&self) -> GeneratorParams {
        GeneratorParams {
            rotation_range: if self.rotate { 180.0 } else { 0.0 },
            shear_range: if self.shear { 1.0 } else { 0.0 },
            horizontal_flip: self.flip,
            vertical_flip: self.flip,
        }
    }

    pub fn is_disabled(&self) -> bool {
        !(self.rotate || self.flip || self.shear)
    }
}
