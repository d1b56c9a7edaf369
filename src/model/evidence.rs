//! Logit-to-evidence transforms

use crate::autograd::{clamp, exp, relu, softplus, Tensor};
use mtedl_common::{MtedlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logits are clamped to this magnitude before `exp`
const EXP_CLAMP: f32 = 10.0;

/// Non-negative transform applied to raw logits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceActivation {
    Relu,
    Exp,
    #[default]
    Softplus,
}

impl EvidenceActivation {
    pub fn apply(self, logits: &Tensor) -> Tensor {
        match self {
            Self::Relu => relu(logits),
            Self::Exp => exp(&clamp(logits, -EXP_CLAMP, EXP_CLAMP)),
            Self::Softplus => softplus(logits),
        }
    }
}

impl fmt::Display for EvidenceActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Relu => "relu",
            Self::Exp => "exp",
            Self::Softplus => "softplus",
        })
    }
}

impl FromStr for EvidenceActivation {
    type Err = MtedlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relu" => Ok(Self::Relu),
            "exp" => Ok(Self::Exp),
            "softplus" => Ok(Self::Softplus),
            other => Err(MtedlError::config(
                "evidence",
                format!("unknown evidence activation '{other}'"),
                "Use one of: relu, exp, softplus",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_is_non_negative() {
        let logits = Tensor::from_vec(1, 4, vec![-50.0, -1.0, 0.5, 30.0], false);
        for act in [
            EvidenceActivation::Relu,
            EvidenceActivation::Exp,
            EvidenceActivation::Softplus,
        ] {
            let ev = act.apply(&logits);
            assert!(ev.data().iter().all(|&e| e >= 0.0), "{act}");
            assert!(ev.is_finite(), "{act}");
        }
    }

    #[test]
    fn test_exp_is_clamped() {
        let logits = Tensor::from_vec(1, 1, vec![100.0], false);
        let ev = EvidenceActivation::Exp.apply(&logits).item();
        assert!((ev - 10.0f32.exp()).abs() < 1.0);
    }

    #[test]
    fn test_parse_round_trip() {
        for s in ["relu", "exp", "softplus"] {
            assert_eq!(s.parse::<EvidenceActivation>().unwrap().to_string(), s);
        }
        assert!("tanh".parse::<EvidenceActivation>().is_err());
    }
}
