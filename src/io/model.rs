//! Checkpoint structure for serialization

use crate::nn::StateDict;
use chrono::{DateTime, Utc};
use mtedl_common::{MtedlError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One serialized parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// `[rows, cols]`
    pub shape: Vec<usize>,

    /// Row-major values
    pub data: Vec<f32>,
}

impl ParameterRecord {
    pub fn from_array(value: &Array2<f32>) -> Self {
        let (rows, cols) = value.dim();
        Self {
            shape: vec![rows, cols],
            data: value.iter().copied().collect(),
        }
    }

    pub fn to_array(&self, name: &str) -> Result<Array2<f32>> {
        let mismatch = || MtedlError::ShapeMismatch {
            context: format!("checkpoint parameter '{name}'"),
            expected: self.shape.clone(),
            actual: vec![self.data.len()],
        };
        let [rows, cols] = self.shape[..] else {
            return Err(mismatch());
        };
        Array2::from_shape_vec((rows, cols), self.data.clone()).map_err(|_| mismatch())
    }
}

/// Persisted model parameters
///
/// ```json
/// {"params": {"encoder.layers.0.weight": {"shape": [64, 32], "data": [...]}},
///  "saved_at": "2024-01-01T00:00:00Z"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub params: BTreeMap<String, ParameterRecord>,

    /// When the checkpoint was written
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot `state`, stamped with the current time
    pub fn from_state(state: &StateDict) -> Self {
        Self {
            params: state
                .iter()
                .map(|(name, value)| (name.clone(), ParameterRecord::from_array(value)))
                .collect(),
            saved_at: Utc::now(),
        }
    }

    pub fn to_state(&self) -> Result<StateDict> {
        self.params
            .iter()
            .map(|(name, record)| Ok((name.clone(), record.to_array(name)?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_checkpoint_state_round_trip() {
        let mut state = StateDict::new();
        state.insert("weight".into(), arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]));
        state.insert("bias".into(), arr2(&[[0.1, 0.2]]));

        let ckpt = Checkpoint::from_state(&state);
        assert_eq!(ckpt.len(), 2);
        assert_eq!(ckpt.params["weight"].shape, vec![3, 2]);
        assert_eq!(ckpt.params["weight"].data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(ckpt.to_state().unwrap(), state);
    }

    #[test]
    fn test_corrupt_record_is_shape_mismatch() {
        let record = ParameterRecord {
            shape: vec![2, 2],
            data: vec![1.0, 2.0, 3.0],
        };
        let err = record.to_array("w").unwrap_err();
        assert!(matches!(err, MtedlError::ShapeMismatch { .. }));

        let record = ParameterRecord {
            shape: vec![4],
            data: vec![1.0; 4],
        };
        assert!(record.to_array("w").is_err());
    }
}
