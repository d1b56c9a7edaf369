//! Checkpoint persistence
//!
//! Checkpoints are JSON files mapping dotted parameter names to
//! `{shape, data}` records. Every write goes through [`write_json_atomic`].

mod load;
mod model;
mod save;

pub use load::{filter_with_prefix, load_checkpoint, load_state_dict};
pub use model::{Checkpoint, ParameterRecord};
pub use save::{save_checkpoint, write_json_atomic};
