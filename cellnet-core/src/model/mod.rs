//! Model topologies — layer descriptions, shape inference, the feature net zoo.

pub mod feature_net;
pub mod layers;

pub use feature_net::{FeatureNet, FeatureNetConfig, bn_feature_net_61x61};
pub use layers::{ActivationFn, Layer, LayerKind, Shape};
