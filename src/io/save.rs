//! Checkpoint and log saving

use super::model::Checkpoint;
use crate::nn::StateDict;
use mtedl_common::{MtedlError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialize `value` as pretty JSON and replace `path` atomically
///
/// The data goes to a sibling temporary file first and is renamed into place,
/// so readers never observe a partially written file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| MtedlError::io(format!("creating {}", parent.display()), e))?;
    }

    let data = serde_json::to_string_pretty(value)
        .map_err(|e| MtedlError::serialization(format!("JSON serialization failed: {e}")))?;

    let tmp = temp_path(path);
    fs::write(&tmp, data).map_err(|e| MtedlError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        MtedlError::io(
            format!("renaming {} to {}", tmp.display(), path.display()),
            e,
        )
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save a parameter mapping as a checkpoint
///
/// # Example
///
/// ```no_run
/// use mtedl::io::save_checkpoint;
/// use mtedl::nn::{Linear, Module};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let layer = Linear::new(4, 2, &mut rng);
/// save_checkpoint(&layer.state_dict(), "max_acc.json").unwrap();
/// ```
pub fn save_checkpoint(state: &StateDict, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    write_json_atomic(path, &Checkpoint::from_state(state))?;
    debug!(path = %path.display(), params = state.len(), "checkpoint saved");
    Ok(())
}
