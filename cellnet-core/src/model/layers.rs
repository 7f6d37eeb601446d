//! Layer descriptions and shape inference.

use crate::error::{CellnetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tensor shape flowing between layers, channels first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Spatial {
        channels: usize,
        height: usize,
        width: usize,
    },
    Flat {
        units: usize,
    },
}

impl Shape {
    pub fn spatial(channels: usize, height: usize, width: usize) -> Self {
        Self::Spatial {
            channels,
            height,
            width,
        }
    }

    /// Number of scalar values in one sample of this shape.
    pub fn volume(&self) -> usize {
        match *self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => channels * height * width,
            Shape::Flat { units } => units,
        }
    }

    /// Size of the axis batch normalisation and dense layers act on.
    fn feature_axis(&self) -> usize {
        match *self {
            Shape::Spatial { channels, .. } => channels,
            Shape::Flat { units } => units,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => write!(f, "({channels}, {height}, {width})"),
            Shape::Flat { units } => write!(f, "({units})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFn {
    Relu,
    Softmax,
}

/// What a layer does, independent of its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    /// Valid-padded 2D convolution with an L2 weight penalty.
    Conv2d { filters: usize, kernel: usize, l2: f64 },
    /// Batch normalisation over the channel (or unit) axis.
    BatchNorm,
    Activation { function: ActivationFn },
    /// Non-overlapping max pooling with stride equal to the pool size.
    MaxPool2d { pool: usize },
    Flatten,
    Dense { units: usize, l2: f64 },
}

impl LayerKind {
    /// Prefix used when asking a naming scope for this layer's name.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            LayerKind::Conv2d { .. } => "convolution2d",
            LayerKind::BatchNorm => "batchnormalization",
            LayerKind::Activation { .. } => "activation",
            LayerKind::MaxPool2d { .. } => "maxpooling2d",
            LayerKind::Flatten => "flatten",
            LayerKind::Dense { .. } => "dense",
        }
    }

    /// Infer the output shape for the given input shape.
    pub fn output_shape(&self, input: Shape) -> Result<Shape> {
        match (self, input) {
            (
                LayerKind::Conv2d {
                    filters, kernel, ..
                },
                Shape::Spatial { height, width, .. },
            ) => {
                if *kernel == 0 || height < *kernel || width < *kernel {
                    return Err(CellnetError::model(format!(
                        "kernel {kernel}x{kernel} does not fit input {input}"
                    )));
                }
                Ok(Shape::spatial(
                    *filters,
                    height - kernel + 1,
                    width - kernel + 1,
                ))
            }
            (
                LayerKind::MaxPool2d { pool },
                Shape::Spatial {
                    channels,
                    height,
                    width,
                },
            ) => {
                if *pool == 0 || height < *pool || width < *pool {
                    return Err(CellnetError::model(format!(
                        "pool {pool}x{pool} does not fit input {input}"
                    )));
                }
                Ok(Shape::spatial(channels, height / pool, width / pool))
            }
            (LayerKind::Flatten, shape) => Ok(Shape::Flat {
                units: shape.volume(),
            }),
            (LayerKind::Dense { units, .. }, Shape::Flat { .. }) => Ok(Shape::Flat { units: *units }),
            (LayerKind::BatchNorm | LayerKind::Activation { .. }, shape) => Ok(shape),
            (kind, shape) => Err(CellnetError::model(format!(
                "{} cannot take input of shape {shape}",
                kind.name_prefix()
            ))),
        }
    }

    /// `(trainable, non_trainable)` parameter counts for the given input shape.
    pub fn param_count(&self, input: Shape) -> (usize, usize) {
        match self {
            LayerKind::Conv2d {
                filters, kernel, ..
            } => (input.feature_axis() * kernel * kernel * filters + filters, 0),
            LayerKind::BatchNorm => {
                let axis = input.feature_axis();
                // gamma/beta train, running mean/std do not
                (2 * axis, 2 * axis)
            }
            LayerKind::Dense { units, .. } => (input.volume() * units + units, 0),
            LayerKind::Activation { .. } | LayerKind::MaxPool2d { .. } | LayerKind::Flatten => {
                (0, 0)
            }
        }
    }
}

/// A named layer with its inferred shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub input_shape: Shape,
    pub output_shape: Shape,
    pub trainable_params: usize,
    pub non_trainable_params: usize,
}
