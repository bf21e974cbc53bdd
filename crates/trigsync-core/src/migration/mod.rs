//! Migration state snapshots and operation synthesis.

pub mod state;
pub mod synth;

pub use state::{MigrationState, ModelState};
pub use synth::{apply, synthesize, MigrationOp};
