//! Declared trigger state snapshots.
//!
//! A `MigrationState` is the trigger set of every model at one point in the
//! schema's evolution. The host migration framework records one per
//! migration; the synthesizer diffs the recorded snapshot against the
//! currently declared one. Snapshots serialize to JSON so the host tool can
//! persist them as migration-file content.

use crate::error::Error;
use crate::model::ModelRef;
use crate::registry::Registry;
use crate::trigger::TriggerDef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One model's declared triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    /// Model identity.
    pub model: ModelRef,
    /// Declared triggers, in declaration order.
    pub triggers: Vec<TriggerDef>,
}

/// The declared trigger state of every model at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MigrationState {
    /// Per-model state, in declaration order.
    pub models: Vec<ModelState>,
}

/// A table's effective trigger set after collapsing proxies.
#[derive(Debug, Clone)]
pub(crate) struct TableState {
    /// Representative model identity; the table's owner when one exists.
    pub(crate) model: ModelRef,
    /// Whether any declaring model owns the table's lifecycle.
    pub(crate) owner_managed: bool,
    /// Triggers by logical name.
    pub(crate) triggers: BTreeMap<String, TriggerDef>,
}

impl MigrationState {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model's declared triggers (builder style).
    pub fn with_model(
        mut self,
        model: ModelRef,
        triggers: impl IntoIterator<Item = TriggerDef>,
    ) -> Self {
        self.add_model(model, triggers);
        self
    }

    /// Add a model's declared triggers.
    pub fn add_model(
        &mut self,
        model: ModelRef,
        triggers: impl IntoIterator<Item = TriggerDef>,
    ) {
        self.models.push(ModelState {
            model,
            triggers: triggers.into_iter().collect(),
        });
    }

    /// Remove a model by name, dropping its trigger state.
    pub fn remove_model(&mut self, name: &str) {
        self.models.retain(|m| m.model.name != name);
    }

    /// Snapshot the current registry contents.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut state = MigrationState::new();
        for (model, trigger) in registry.snapshot() {
            match state.models.iter_mut().find(|m| m.model == model) {
                Some(entry) => entry.triggers.push(trigger),
                None => state.add_model(model, [trigger]),
            }
        }
        state
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Collapse the per-model state onto underlying tables.
    ///
    /// Two models declaring the same trigger on one table (a proxy and its
    /// base, or two proxies) deduplicate when the definitions agree; a
    /// same-name declaration with differing definitions has no correct
    /// resolution and fails.
    pub(crate) fn table_map(&self) -> Result<BTreeMap<String, TableState>, Error> {
        let mut tables: BTreeMap<String, TableState> = BTreeMap::new();

        for model_state in &self.models {
            let model = &model_state.model;
            let entry = tables
                .entry(model.table.clone())
                .or_insert_with(|| TableState {
                    model: model.clone(),
                    owner_managed: false,
                    triggers: BTreeMap::new(),
                });
            if model.managed {
                // The owning model is the table's representative identity.
                entry.model = model.clone();
                entry.owner_managed = true;
            }

            for trigger in &model_state.triggers {
                match entry.triggers.get(&trigger.name) {
                    None => {
                        entry.triggers.insert(trigger.name.clone(), trigger.clone());
                    }
                    Some(existing) if existing == trigger => {}
                    Some(_) => {
                        return Err(Error::Synthesis(format!(
                            "conflicting declarations of trigger {} on table {}",
                            trigger.name, model.table
                        )));
                    }
                }
            }
        }

        Ok(tables)
    }
}
