//! Neural network building blocks with named parameters
//!
//! Parameter names follow a dotted path convention (`layers.0.weight`,
//! `encoder.layers.1.bias`) so that checkpoints can be merged and filtered by
//! key prefix.

mod backbone;
mod linear;

pub use backbone::{Backbone, MlpBackbone};
pub use linear::{linear, Linear};

use crate::autograd::Tensor;
use mtedl_common::{MtedlError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;

/// Ordered mapping of parameter name to value
pub type StateDict = BTreeMap<String, Array2<f32>>;

/// Anything that owns named trainable tensors
pub trait Module {
    /// Parameters in a stable order, keyed by dotted name
    fn named_parameters(&self) -> Vec<(String, Tensor)>;

    fn parameters(&self) -> Vec<Tensor> {
        self.named_parameters().into_iter().map(|(_, t)| t).collect()
    }

    /// Snapshot of every parameter value
    fn state_dict(&self) -> StateDict {
        self.named_parameters()
            .into_iter()
            .map(|(name, t)| (name, t.to_array()))
            .collect()
    }

    /// Names of parameters that `state` does not cover
    ///
    /// Every key `state` does cover must match the parameter's shape.
    fn check_state(&self, state: &StateDict) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for (name, param) in self.named_parameters() {
            match state.get(&name) {
                Some(value) => check_shape(&name, &param, value)?,
                None => missing.push(name),
            }
        }
        Ok(missing)
    }

    /// Copy values for every parameter present in `state`
    ///
    /// Returns the names of parameters that `state` does not cover. A present key
    /// with the wrong shape is an error, and then no parameter is written.
    fn load_matching(&self, state: &StateDict) -> Result<Vec<String>> {
        let missing = self.check_state(state)?;
        for (name, param) in self.named_parameters() {
            if let Some(value) = state.get(&name) {
                param.data_mut().assign(value);
            }
        }
        Ok(missing)
    }

    /// Enable or disable gradient tracking for every parameter
    fn set_trainable(&self, trainable: bool) {
        for param in self.parameters() {
            param.set_requires_grad(trainable);
        }
    }

    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(Tensor::len).sum()
    }
}

fn check_shape(name: &str, param: &Tensor, value: &Array2<f32>) -> Result<()> {
    if param.shape() != value.dim() {
        let (er, ec) = param.shape();
        let (ar, ac) = value.dim();
        return Err(MtedlError::ShapeMismatch {
            context: format!("parameter '{name}'"),
            expected: vec![er, ec],
            actual: vec![ar, ac],
        });
    }
    Ok(())
}

/// Prepend `prefix` to every parameter name
pub fn prefixed(prefix: &str, params: Vec<(String, Tensor)>) -> Vec<(String, Tensor)> {
    params
        .into_iter()
        .map(|(name, t)| (format!("{prefix}{name}"), t))
        .collect()
}
