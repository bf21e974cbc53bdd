//! Model identities.

use serde::{Deserialize, Serialize};

/// A stable reference to the database table a model binds triggers to.
///
/// The identity deliberately knows nothing about fields or relations; the
/// registry and synthesizer only need a table name and whether this model
/// owns the table's lifecycle. A proxy shares another model's table, and an
/// unmanaged model binds to a table created outside this system; neither
/// owns its table, so dropping the model must not assume the table goes
/// away with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Model name (unique within the declaring application).
    pub name: String,
    /// Underlying table name.
    pub table: String,
    /// Whether this model owns the table's creation and deletion.
    pub managed: bool,
}

impl ModelRef {
    /// A regular model owning its table.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            managed: true,
        }
    }

    /// A proxy model over another model's table.
    pub fn proxy(name: impl Into<String>, of: &ModelRef) -> Self {
        Self {
            name: name.into(),
            table: of.table.clone(),
            managed: false,
        }
    }

    /// A model bound to a pre-existing or externally-owned table.
    pub fn unmanaged(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            managed: false,
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.table)
    }
}
