//! Core error types.

use thiserror::Error;

/// Errors raised by the trigger registry, installer, and synthesizer.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid declaration (duplicate trigger name, malformed identifier,
    /// empty operation set).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A trigger was referenced that is not registered.
    #[error("trigger {name} is not registered on table {table}")]
    NotFound {
        /// Table the lookup was scoped to.
        table: String,
        /// Logical trigger name.
        name: String,
    },

    /// DDL execution failed while installing or uninstalling a trigger.
    #[error("installation failed for trigger {name} on table {table}: {source}")]
    Installation {
        /// Table the trigger targets.
        table: String,
        /// Logical trigger name.
        name: String,
        /// Underlying database error.
        #[source]
        source: rusqlite::Error,
    },

    /// Unresolvable structural conflict between declared states.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Catalog query or other database error outside DDL execution.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration state serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregate failure from a sweep operation.
///
/// Sweeps continue past per-trigger failures so one broken trigger does not
/// hide the rest; every collected failure keeps its model/trigger identity.
#[derive(Debug, Error)]
#[error("{} of {attempted} trigger operations failed", .failures.len())]
pub struct SweepError {
    /// Number of (model, trigger) pairs attempted.
    pub attempted: usize,
    /// Per-trigger failures, in registry order.
    pub failures: Vec<Error>,
}

impl SweepError {
    /// Render each collected failure on its own line.
    pub fn details(&self) -> String {
        self.failures
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
