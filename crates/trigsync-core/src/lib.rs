//! trigsync core - declarative database triggers kept in sync with the
//! live catalog across schema migrations.
//!
//! Triggers are declared in code as [`TriggerDef`] values bound to model
//! identities through a [`Registry`]. The installer reconciles declared
//! state against the catalog, and the synthesizer diffs two declared states
//! into the minimal migration operation list carrying one to the other.

pub mod config;
pub mod error;
pub mod install;
pub mod migration;
pub mod model;
pub mod registry;
pub mod trigger;

pub use config::Settings;
pub use error::{Error, SweepError};
pub use install::{
    install, install_all, prune, status, sweep, uninstall, uninstall_all, InstallStatus,
    StatusReport,
};
pub use migration::{apply, synthesize, MigrationOp, MigrationState, ModelState};
pub use model::ModelRef;
pub use registry::{Registry, ScopedRegistration};
pub use trigger::{
    CompareOp, Condition, Operation, Operations, RowRef, Timing, TriggerDef, Value,
};
