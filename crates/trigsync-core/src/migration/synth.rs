//! Migration operation synthesis.
//!
//! Diffs two declared trigger states and emits the minimal operation list
//! carrying the first state to the second. The synthesizer performs no DDL;
//! the host migration tool serializes the operations into migration files
//! and later replays them through [`apply`].

use super::state::MigrationState;
use crate::config::Settings;
use crate::error::Error;
use crate::install::installer;
use crate::model::ModelRef;
use crate::trigger::TriggerDef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// One step in a synthesized migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MigrationOp {
    /// Install a newly declared trigger.
    AddTrigger {
        /// Model the trigger binds to.
        model: ModelRef,
        /// The declaration to install.
        trigger: TriggerDef,
    },
    /// Reinstall a trigger whose declaration changed.
    UpdateTrigger {
        /// Model the trigger binds to.
        model: ModelRef,
        /// The new declaration.
        trigger: TriggerDef,
    },
    /// Drop a trigger that is no longer declared.
    RemoveTrigger {
        /// Model the trigger was bound to.
        model: ModelRef,
        /// Logical trigger name.
        name: String,
    },
}

impl MigrationOp {
    /// Logical trigger name this operation concerns.
    pub fn trigger_name(&self) -> &str {
        match self {
            MigrationOp::AddTrigger { trigger, .. } => &trigger.name,
            MigrationOp::UpdateTrigger { trigger, .. } => &trigger.name,
            MigrationOp::RemoveTrigger { name, .. } => name,
        }
    }

    /// Model identity this operation targets.
    pub fn model(&self) -> &ModelRef {
        match self {
            MigrationOp::AddTrigger { model, .. } => model,
            MigrationOp::UpdateTrigger { model, .. } => model,
            MigrationOp::RemoveTrigger { model, .. } => model,
        }
    }
}

/// Diff two declared states into an ordered operation list.
///
/// Emission order is deterministic: tables sorted by name, and within each
/// table adds, then updates, then removes, each name-sorted. Running the
/// synthesizer twice over unchanged state therefore yields a byte-identical
/// list the first time and an empty one the second.
pub fn synthesize(
    prior: &MigrationState,
    current: &MigrationState,
) -> Result<Vec<MigrationOp>, Error> {
    let prior_tables = prior.table_map()?;
    let current_tables = current.table_map()?;

    let all_tables: BTreeSet<&String> =
        prior_tables.keys().chain(current_tables.keys()).collect();

    let mut ops = Vec::new();
    for table in all_tables {
        match (prior_tables.get(table), current_tables.get(table)) {
            // New table identity: install everything it declares.
            (None, Some(cur)) => {
                for trigger in cur.triggers.values() {
                    ops.push(MigrationOp::AddTrigger {
                        model: cur.model.clone(),
                        trigger: trigger.clone(),
                    });
                }
            }
            // Table identity disappeared. When the owning model was managed
            // the table drop takes its triggers with it; otherwise the table
            // outlives the declaration and the triggers must be dropped
            // explicitly.
            (Some(old), None) => {
                if old.owner_managed {
                    debug!(table = %table, "managed table removed, triggers go with it");
                    continue;
                }
                for name in old.triggers.keys() {
                    ops.push(MigrationOp::RemoveTrigger {
                        model: old.model.clone(),
                        name: name.clone(),
                    });
                }
            }
            (Some(old), Some(cur)) => {
                for (name, trigger) in &cur.triggers {
                    match old.triggers.get(name) {
                        None => ops.push(MigrationOp::AddTrigger {
                            model: cur.model.clone(),
                            trigger: trigger.clone(),
                        }),
                        Some(existing) if existing == trigger => {}
                        Some(_) => ops.push(MigrationOp::UpdateTrigger {
                            model: cur.model.clone(),
                            trigger: trigger.clone(),
                        }),
                    }
                }
                for name in old.triggers.keys() {
                    if !cur.triggers.contains_key(name) {
                        ops.push(MigrationOp::RemoveTrigger {
                            model: cur.model.clone(),
                            name: name.clone(),
                        });
                    }
                }
            }
            (None, None) => unreachable!("table came from one of the two maps"),
        }
    }

    // BTreeMap iteration gives name-sorted adds/updates interleaved with
    // removes per table; sort each table's block into add/update/remove
    // order while keeping names sorted within a kind.
    ops.sort_by_key(|op| {
        let kind = match op {
            MigrationOp::AddTrigger { .. } => 0u8,
            MigrationOp::UpdateTrigger { .. } => 1,
            MigrationOp::RemoveTrigger { .. } => 2,
        };
        (
            op.model().table.clone(),
            kind,
            op.trigger_name().to_string(),
        )
    });

    debug!(count = ops.len(), "synthesized migration operations");
    Ok(ops)
}

/// Replay a synthesized operation list against the live connection.
///
/// The external migration executor's entry point: applies each operation in
/// order through the installer. Honors the `install_on_migrate` switch; when
/// it is off the operation list is recorded by the caller but no DDL runs,
/// leaving installation to an explicit install command.
pub fn apply(conn: &Connection, ops: &[MigrationOp], settings: &Settings) -> Result<(), Error> {
    if !settings.install_on_migrate {
        info!(
            count = ops.len(),
            "install_on_migrate disabled, skipping trigger DDL"
        );
        return Ok(());
    }

    for op in ops {
        match op {
            MigrationOp::AddTrigger { model, trigger }
            | MigrationOp::UpdateTrigger { model, trigger } => {
                installer::install(conn, model, trigger)?;
            }
            MigrationOp::RemoveTrigger { model, name } => {
                installer::uninstall(conn, model, name)?;
            }
        }
    }
    Ok(())
}
