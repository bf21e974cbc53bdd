//! Installation status checks against the live catalog.
//!
//! Status is derived, never stored: every query re-reads `sqlite_master`,
//! so a check is always safe to repeat and reflects whatever DDL ran since
//! the last one.

use crate::error::Error;
use crate::model::ModelRef;
use crate::registry::Registry;
use crate::trigger::{extract_marker, parse_physical, physical_name, signature, TriggerDef};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Relationship between one declared trigger and the live catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// Live DDL matches the declaration exactly.
    Installed,
    /// A trigger with this name exists but its DDL differs.
    Outdated,
    /// Declared but absent from the catalog.
    Uninstalled,
    /// Present in the catalog, tagged as ours, but no longer declared.
    Prune,
}

impl std::fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallStatus::Installed => write!(f, "INSTALLED"),
            InstallStatus::Outdated => write!(f, "OUTDATED"),
            InstallStatus::Uninstalled => write!(f, "UNINSTALLED"),
            InstallStatus::Prune => write!(f, "PRUNE"),
        }
    }
}

/// One row of a model-wide status sweep.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Model the trigger is (or was) bound to.
    pub model: ModelRef,
    /// Logical trigger name.
    pub trigger: String,
    /// Derived status.
    pub status: InstallStatus,
}

/// A trigger object read back from `sqlite_master`.
#[derive(Debug, Clone)]
pub(crate) struct InstalledTrigger {
    pub(crate) table: String,
    pub(crate) name: String,
    pub(crate) sql: String,
}

/// All trigger objects on one table.
pub(crate) fn installed_on(conn: &Connection, table: &str) -> Result<Vec<InstalledTrigger>, Error> {
    let mut stmt = conn.prepare(
        "SELECT tbl_name, name, sql FROM sqlite_master \
         WHERE type = 'trigger' AND tbl_name = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok(InstalledTrigger {
            table: row.get(0)?,
            name: row.get(1)?,
            sql: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// All trigger objects in the database.
fn installed_all(conn: &Connection) -> Result<Vec<InstalledTrigger>, Error> {
    let mut stmt = conn.prepare(
        "SELECT tbl_name, name, sql FROM sqlite_master \
         WHERE type = 'trigger' ORDER BY tbl_name, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(InstalledTrigger {
            table: row.get(0)?,
            name: row.get(1)?,
            sql: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Physical triggers on a table belonging to one logical declaration.
pub(crate) fn physicals_for(
    conn: &Connection,
    table: &str,
    logical: &str,
) -> Result<Vec<InstalledTrigger>, Error> {
    Ok(installed_on(conn, table)?
        .into_iter()
        .filter(|t| parse_physical(&t.name) == Some(logical))
        .collect())
}

/// Classify one declared trigger against the live catalog.
pub fn status(
    conn: &Connection,
    model: &ModelRef,
    def: &TriggerDef,
) -> Result<InstallStatus, Error> {
    let expected_sig = signature(def, &model.table)?;
    let expected_names: BTreeSet<String> = def
        .operations
        .iter()
        .map(|op| physical_name(&def.name, op))
        .collect();

    let present = physicals_for(conn, &model.table, &def.name)?;
    if present.is_empty() {
        return Ok(InstallStatus::Uninstalled);
    }

    let present_names: BTreeSet<String> = present.iter().map(|t| t.name.clone()).collect();
    let signatures_match = present
        .iter()
        .all(|t| extract_marker(&t.sql) == Some(expected_sig.as_str()));

    if present_names == expected_names && signatures_match {
        Ok(InstallStatus::Installed)
    } else {
        Ok(InstallStatus::Outdated)
    }
}

/// Orphaned physical triggers: tagged as ours, but their logical name is no
/// longer registered on their table.
pub(crate) fn orphaned_physicals(
    conn: &Connection,
    registry: &Registry,
) -> Result<Vec<InstalledTrigger>, Error> {
    let snapshot = registry.snapshot();
    let registered: BTreeSet<(String, String)> = snapshot
        .iter()
        .map(|(model, trigger)| (model.table.clone(), trigger.name.clone()))
        .collect();

    Ok(installed_all(conn)?
        .into_iter()
        .filter(|t| match parse_physical(&t.name) {
            Some(logical) => !registered.contains(&(t.table.clone(), logical.to_string())),
            None => false,
        })
        .collect())
}

/// Full status sweep: one report per registered (model, trigger) pair, in
/// registry order, followed by one `Prune` report per orphaned logical
/// trigger found in the catalog.
pub fn sweep(conn: &Connection, registry: &Registry) -> Result<Vec<StatusReport>, Error> {
    let snapshot = registry.snapshot();
    let mut reports = Vec::new();

    for (model, trigger) in &snapshot {
        reports.push(StatusReport {
            model: model.clone(),
            trigger: trigger.name.clone(),
            status: status(conn, model, trigger)?,
        });
    }

    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    for orphan in orphaned_physicals(conn, registry)? {
        let logical = match parse_physical(&orphan.name) {
            Some(l) => l.to_string(),
            None => continue,
        };
        if !seen.insert((orphan.table.clone(), logical.clone())) {
            continue;
        }
        let model = snapshot
            .iter()
            .find(|(m, _)| m.table == orphan.table)
            .map(|(m, _)| m.clone())
            .unwrap_or_else(|| ModelRef::unmanaged(orphan.table.clone(), orphan.table.clone()));
        reports.push(StatusReport {
            model,
            trigger: logical,
            status: InstallStatus::Prune,
        });
    }

    Ok(reports)
}
