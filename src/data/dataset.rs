//! Dataset contract and the JSON feature dataset

use mtedl_common::{MtedlError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Labeled pool of fixed-size feature vectors
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer class of item `index`
    fn label(&self, index: usize) -> usize;

    fn labels(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    fn num_classes(&self) -> usize {
        self.labels().into_iter().collect::<BTreeSet<_>>().len()
    }

    fn feature_dim(&self) -> usize;

    /// Stack the features of `indices` into an `indices.len() x feature_dim` matrix
    fn features(&self, indices: &[usize]) -> Array2<f32>;
}

/// Dataset split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct FeatureFile {
    features: Vec<Vec<f32>>,
    labels: Vec<usize>,
}

/// In-memory dataset of pre-extracted feature vectors
///
/// On disk: `<data_root>/<dataset_dir>/<split>.json` holding
/// `{"features": [[f32; dim]; n], "labels": [usize; n]}`.
#[derive(Debug, Clone)]
pub struct FeatureDataset {
    features: Array2<f32>,
    labels: Vec<usize>,
}

impl FeatureDataset {
    pub fn new(features: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(MtedlError::ShapeMismatch {
                context: "dataset features vs labels".into(),
                expected: vec![labels.len()],
                actual: vec![features.nrows()],
            });
        }
        Ok(Self { features, labels })
    }

    /// Path of a split file under `data_root`
    pub fn split_path(data_root: &Path, dataset_dir: &str, split: Split) -> PathBuf {
        data_root
            .join(dataset_dir)
            .join(format!("{}.json", split.as_str()))
    }

    pub fn open(data_root: &Path, dataset_dir: &str, split: Split) -> Result<Self> {
        Self::load(&Self::split_path(data_root, dataset_dir, split))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| MtedlError::io(format!("reading dataset {}", path.display()), e))?;
        let file: FeatureFile = serde_json::from_str(&content).map_err(|e| {
            MtedlError::serialization(format!("dataset {}: {e}", path.display()))
        })?;

        let dim = file.features.first().map_or(0, Vec::len);
        if let Some((row, bad)) = file
            .features
            .iter()
            .enumerate()
            .find(|(_, f)| f.len() != dim)
        {
            return Err(MtedlError::ShapeMismatch {
                context: format!("dataset {} row {row}", path.display()),
                expected: vec![dim],
                actual: vec![bad.len()],
            });
        }

        let n = file.features.len();
        let flat: Vec<f32> = file.features.into_iter().flatten().collect();
        let features = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| MtedlError::serialization(format!("dataset {}: {e}", path.display())))?;
        Self::new(features, file.labels)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = FeatureFile {
            features: self.features.rows().into_iter().map(|r| r.to_vec()).collect(),
            labels: self.labels.clone(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MtedlError::io(format!("creating {}", parent.display()), e))?;
        }
        let json = serde_json::to_string(&file)
            .map_err(|e| MtedlError::serialization(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| MtedlError::io(format!("writing dataset {}", path.display()), e))
    }
}

impl Dataset for FeatureDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    fn labels(&self) -> Vec<usize> {
        self.labels.clone()
    }

    fn feature_dim(&self) -> usize {
        self.features.ncols()
    }

    fn features(&self, indices: &[usize]) -> Array2<f32> {
        self.features.select(Axis(0), indices)
    }
}
