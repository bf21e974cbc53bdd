//! Installation status checks and DDL execution.

pub mod installer;
pub mod status;

pub use installer::{install, install_all, prune, uninstall, uninstall_all};
pub use status::{status, sweep, InstallStatus, StatusReport};
