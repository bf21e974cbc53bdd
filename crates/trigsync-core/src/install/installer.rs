//! Trigger installation and removal.
//!
//! DDL execution against the live connection. Each physical trigger's
//! create/drop runs as its own statement, so one trigger's failure cannot
//! block the others; sweeps aggregate failures instead of aborting.

use super::status::{self, orphaned_physicals, physicals_for, InstallStatus};
use crate::error::{Error, SweepError};
use crate::model::ModelRef;
use crate::registry::Registry;
use crate::trigger::{render_create, render_drop, TriggerDef};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Install one trigger, idempotently.
///
/// No-op when already installed; creates when absent; drops and recreates
/// when the installed DDL no longer matches the declaration.
pub fn install(conn: &Connection, model: &ModelRef, def: &TriggerDef) -> Result<(), Error> {
    match status::status(conn, model, def)? {
        InstallStatus::Installed => {
            debug!(model = %model, trigger = %def.name, "already installed");
            return Ok(());
        }
        current => {
            debug!(model = %model, trigger = %def.name, status = %current, "installing");
        }
    }

    drop_physicals(conn, &model.table, &def.name)?;
    for statement in render_create(def, &model.table)? {
        conn.execute(&statement.sql, []).map_err(|source| {
            Error::Installation {
                table: model.table.clone(),
                name: def.name.clone(),
                source,
            }
        })?;
    }
    info!(model = %model, trigger = %def.name, "installed trigger");
    Ok(())
}

/// Uninstall one trigger by logical name, idempotently.
pub fn uninstall(conn: &Connection, model: &ModelRef, name: &str) -> Result<(), Error> {
    let dropped = drop_physicals(conn, &model.table, name)?;
    if dropped == 0 {
        debug!(model = %model, trigger = name, "already uninstalled");
    } else {
        info!(model = %model, trigger = name, "uninstalled trigger");
    }
    Ok(())
}

fn drop_physicals(conn: &Connection, table: &str, logical: &str) -> Result<usize, Error> {
    let present = physicals_for(conn, table, logical)?;
    for trigger in &present {
        conn.execute(&render_drop(&trigger.name), [])
            .map_err(|source| Error::Installation {
                table: table.to_string(),
                name: logical.to_string(),
                source,
            })?;
    }
    Ok(present.len())
}

/// Install every registered trigger, in registry order.
///
/// Continues past per-trigger failures and reports them together.
pub fn install_all(conn: &Connection, registry: &Registry) -> Result<(), SweepError> {
    run_sweep(registry, |model, def| install(conn, model, def))
}

/// Uninstall every registered trigger, in registry order.
pub fn uninstall_all(conn: &Connection, registry: &Registry) -> Result<(), SweepError> {
    run_sweep(registry, |model, def| uninstall(conn, model, &def.name))
}

fn run_sweep(
    registry: &Registry,
    mut op: impl FnMut(&ModelRef, &TriggerDef) -> Result<(), Error>,
) -> Result<(), SweepError> {
    let snapshot = registry.snapshot();
    let attempted = snapshot.len();
    let mut failures = Vec::new();

    for (model, def) in &snapshot {
        if let Err(e) = op(model, def) {
            warn!(model = %model, trigger = %def.name, error = %e, "sweep item failed");
            failures.push(e);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(SweepError {
            attempted,
            failures,
        })
    }
}

/// Drop every orphaned trigger tagged as ours.
///
/// Returns the physical names dropped. User-authored triggers are never
/// touched.
pub fn prune(conn: &Connection, registry: &Registry) -> Result<Vec<String>, Error> {
    let mut dropped = Vec::new();
    for orphan in orphaned_physicals(conn, registry)? {
        conn.execute(&render_drop(&orphan.name), [])
            .map_err(|source| Error::Installation {
                table: orphan.table.clone(),
                name: orphan.name.clone(),
                source,
            })?;
        info!(table = %orphan.table, trigger = %orphan.name, "pruned orphaned trigger");
        dropped.push(orphan.name);
    }
    Ok(dropped)
}
