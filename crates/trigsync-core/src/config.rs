//! Runtime settings.

use serde::{Deserialize, Serialize};

/// Switches controlling how trigger state is kept in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Run trigger DDL automatically while migration operations are applied.
    /// When off, [`apply`](crate::migration::apply) records nothing to the
    /// database and installation is left to explicit install commands.
    pub install_on_migrate: bool,
    /// Track trigger changes through the migration system at all. When off,
    /// the synthesizer is not engaged and install/uninstall must be invoked
    /// manually.
    pub migrations_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_on_migrate: true,
            migrations_enabled: true,
        }
    }
}

impl Settings {
    /// Disable automatic installation during migration application.
    pub fn without_install_on_migrate(mut self) -> Self {
        self.install_on_migrate = false;
        self
    }

    /// Disable migration tracking entirely.
    pub fn without_migrations(mut self) -> Self {
        self.migrations_enabled = false;
        self
    }
}
