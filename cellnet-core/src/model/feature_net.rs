//! The 61x61 batch-normalised feature net.
//!
//! A sliding-window pixel classifier: each 61x61 patch around a pixel is
//! reduced by valid convolutions and pooling to a single 1x1 position, then
//! classified into `n_features` classes.

use crate::error::{CellnetError, Result};
use crate::model::layers::{ActivationFn, Layer, LayerKind, Shape};
use crate::naming::NameScope;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Side length of the input window.
pub const WINDOW: usize = 61;

/// Architecture hyperparameters for a feature net.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureNetConfig {
    /// Number of output classes.
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    /// Number of input image channels.
    #[serde(default = "default_n_channels")]
    pub n_channels: usize,
    /// L2 weight penalty on convolution and dense kernels.
    #[serde(default = "default_reg")]
    pub reg: f64,
}

impl Default for FeatureNetConfig {
    fn default() -> Self {
        Self {
            n_features: default_n_features(),
            n_channels: default_n_channels(),
            reg: default_reg(),
        }
    }
}

fn default_n_features() -> usize {
    3
}

fn default_n_channels() -> usize {
    2
}

fn default_reg() -> f64 {
    1e-5
}

impl FeatureNetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(CellnetError::model("n_features must be at least 1"));
        }
        if self.n_channels == 0 {
            return Err(CellnetError::model("n_channels must be at least 1"));
        }
        if !self.reg.is_finite() || self.reg < 0.0 {
            return Err(CellnetError::model(format!(
                "reg must be a non-negative finite number, got {}",
                self.reg
            )));
        }
        Ok(())
    }
}

/// A fully shaped, named model description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNet {
    pub architecture: String,
    pub config: FeatureNetConfig,
    pub input_shape: Shape,
    pub layers: Vec<Layer>,
}

impl FeatureNet {
    pub fn output_shape(&self) -> Shape {
        self.layers
            .last()
            .map(|l| l.output_shape)
            .unwrap_or(self.input_shape)
    }

    pub fn trainable_params(&self) -> usize {
        self.layers.iter().map(|l| l.trainable_params).sum()
    }

    pub fn non_trainable_params(&self) -> usize {
        self.layers.iter().map(|l| l.non_trainable_params).sum()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Keras-style summary table.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} (input {})", self.architecture, self.input_shape);
        let _ = writeln!(out, "{:<28} {:<18} {:>10}", "Layer", "Output shape", "Params");
        for layer in &self.layers {
            let _ = writeln!(
                out,
                "{:<28} {:<18} {:>10}",
                layer.name,
                layer.output_shape.to_string(),
                layer.trainable_params + layer.non_trainable_params
            );
        }
        let _ = writeln!(out, "Trainable params: {}", self.trainable_params());
        let _ = write!(out, "Non-trainable params: {}", self.non_trainable_params());
        out
    }
}

/// Incrementally stacks layers, naming each one and tracking the current shape.
struct Stack<'a> {
    names: &'a mut NameScope,
    shape: Shape,
    layers: Vec<Layer>,
}

impl<'a> Stack<'a> {
    fn new(names: &'a mut NameScope, input: Shape) -> Self {
        Self {
            names,
            shape: input,
            layers: Vec::new(),
        }
    }

    fn push(&mut self, kind: LayerKind) -> Result<&mut Self> {
        let output_shape = kind.output_shape(self.shape)?;
        let (trainable_params, non_trainable_params) = kind.param_count(self.shape);
        let name = self.names.unique_name(kind.name_prefix());
        self.layers.push(Layer {
            name,
            kind,
            input_shape: self.shape,
            output_shape,
            trainable_params,
            non_trainable_params,
        });
        self.shape = output_shape;
        Ok(self)
    }

    /// Convolution, batch normalisation, ReLU.
    fn conv_block(&mut self, filters: usize, kernel: usize, l2: f64) -> Result<&mut Self> {
        self.push(LayerKind::Conv2d {
            filters,
            kernel,
            l2,
        })?;
        self.push(LayerKind::BatchNorm)?;
        self.push(LayerKind::Activation {
            function: ActivationFn::Relu,
        })
    }
}

/// Build the `bn_feature_net_61x61` topology.
///
/// Layer names are drawn from `names`; building twice without a reset in
/// between yields `convolution2d_8` and onward for the second model.
pub fn bn_feature_net_61x61(config: &FeatureNetConfig, names: &mut NameScope) -> Result<FeatureNet> {
    config.validate()?;
    let reg = config.reg;
    let input_shape = Shape::spatial(config.n_channels, WINDOW, WINDOW);
    let mut stack = Stack::new(names, input_shape);

    stack.conv_block(64, 3, reg)?.conv_block(64, 4, reg)?;
    stack.push(LayerKind::MaxPool2d { pool: 2 })?;
    stack.conv_block(64, 3, reg)?.conv_block(64, 3, reg)?;
    stack.push(LayerKind::MaxPool2d { pool: 2 })?;
    stack.conv_block(64, 3, reg)?.conv_block(64, 3, reg)?;
    stack.push(LayerKind::MaxPool2d { pool: 2 })?;
    stack.conv_block(200, 4, reg)?;
    stack.push(LayerKind::Flatten)?;
    stack.push(LayerKind::Dense { units: 200, l2: reg })?;
    stack.push(LayerKind::BatchNorm)?;
    stack.push(LayerKind::Activation {
        function: ActivationFn::Relu,
    })?;
    stack.push(LayerKind::Dense {
        units: config.n_features,
        l2: reg,
    })?;
    stack.push(LayerKind::Activation {
        function: ActivationFn::Softmax,
    })?;

    Ok(FeatureNet {
        architecture: "bn_feature_net_61x61".to_string(),
        config: *config,
        input_shape,
        layers: stack.layers,
    })
}
