//! Process-wide trigger registry.
//!
//! The registry is an explicit object with a defined lifecycle: populated at
//! startup from each model's declared triggers, then mutated only through
//! the register/unregister API. It is passed to the installer and
//! synthesizer rather than reached through a global.
//!
//! Registrations are keyed by the underlying table, so a proxy model's
//! triggers land on the same entry as its base model's and name collisions
//! across the two are caught at registration time.

use crate::error::Error;
use crate::model::ModelRef;
use crate::trigger::TriggerDef;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct Registration {
    model: ModelRef,
    trigger: TriggerDef,
}

#[derive(Debug)]
struct TableEntry {
    table: String,
    regs: Vec<Registration>,
}

/// Mapping from table identity to its registered triggers, insertion order
/// preserved.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<Vec<TableEntry>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model's statically declared triggers in bulk.
    ///
    /// Validates every declaration and checks name uniqueness against
    /// triggers already present on the model's table (its own and any
    /// proxy's) before inserting anything.
    pub fn register_model(
        &self,
        model: &ModelRef,
        triggers: impl IntoIterator<Item = TriggerDef>,
    ) -> Result<(), Error> {
        let triggers: Vec<TriggerDef> = triggers.into_iter().collect();
        for trigger in &triggers {
            trigger.validate()?;
        }

        let mut entries = self.entries.lock();
        let existing = entries.iter().find(|e| e.table == model.table);
        for (i, trigger) in triggers.iter().enumerate() {
            let dup_existing = existing
                .map(|e| e.regs.iter().any(|r| r.trigger.name == trigger.name))
                .unwrap_or(false);
            let dup_incoming = triggers[..i].iter().any(|t| t.name == trigger.name);
            if dup_existing || dup_incoming {
                return Err(Error::Configuration(format!(
                    "trigger {} is already registered on table {}",
                    trigger.name, model.table
                )));
            }
        }
        let entry = entry_mut(&mut entries, &model.table);
        for trigger in triggers {
            debug!(model = %model, trigger = %trigger.name, "registering trigger");
            entry.regs.push(Registration {
                model: model.clone(),
                trigger,
            });
        }
        Ok(())
    }

    /// Register a single trigger dynamically.
    pub fn register(&self, model: &ModelRef, trigger: TriggerDef) -> Result<(), Error> {
        self.register_model(model, [trigger])
    }

    /// Remove a registration by logical trigger name.
    pub fn unregister(&self, model: &ModelRef, name: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.table == model.table) else {
            return Err(Error::NotFound {
                table: model.table.clone(),
                name: name.to_string(),
            });
        };
        let Some(pos) = entry.regs.iter().position(|r| r.trigger.name == name) else {
            return Err(Error::NotFound {
                table: model.table.clone(),
                name: name.to_string(),
            });
        };
        debug!(model = %model, trigger = name, "unregistering trigger");
        entry.regs.remove(pos);
        if entry.regs.is_empty() {
            entries.retain(|e| e.table != model.table);
        }
        Ok(())
    }

    /// Register a trigger for the lifetime of the returned guard.
    ///
    /// Unlike [`register`](Self::register), an existing trigger with the
    /// same name is shadowed rather than rejected; the guard restores it on
    /// release. Release runs on every exit path, including panics.
    pub fn scoped_register(
        &self,
        model: &ModelRef,
        trigger: TriggerDef,
    ) -> Result<ScopedRegistration<'_>, Error> {
        trigger.validate()?;
        let name = trigger.name.clone();

        let mut entries = self.entries.lock();
        let created_entry = !entries.iter().any(|e| e.table == model.table);
        let entry = entry_mut(&mut entries, &model.table);

        let registration = Registration {
            model: model.clone(),
            trigger,
        };
        let shadowed = match entry.regs.iter().position(|r| r.trigger.name == name) {
            Some(pos) => Some((pos, std::mem::replace(&mut entry.regs[pos], registration))),
            None => {
                entry.regs.push(registration);
                None
            }
        };

        debug!(model = %model, trigger = %name, "scoped trigger registration");
        Ok(ScopedRegistration {
            registry: self,
            table: model.table.clone(),
            name,
            shadowed,
            created_entry,
        })
    }

    /// Triggers currently registered on the model's table, in registration
    /// order.
    pub fn triggers_for(&self, model: &ModelRef) -> Vec<TriggerDef> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.table == model.table)
            .map(|e| e.regs.iter().map(|r| r.trigger.clone()).collect())
            .unwrap_or_default()
    }

    /// Drop all registry state for a model.
    ///
    /// A managed model takes its whole table entry with it; a proxy or
    /// unmanaged model removes only its own registrations, leaving other
    /// models' triggers on the shared table in place.
    pub fn deregister_model(&self, model: &ModelRef) {
        let mut entries = self.entries.lock();
        if model.managed {
            entries.retain(|e| e.table != model.table);
        } else if let Some(entry) = entries.iter_mut().find(|e| e.table == model.table) {
            entry.regs.retain(|r| r.model.name != model.name);
            if entry.regs.is_empty() {
                entries.retain(|e| e.table != model.table);
            }
        }
    }

    /// Consistent copy of every (model, trigger) registration, in
    /// registration order. Taken under the lock; sweeps iterate the copy.
    pub fn snapshot(&self) -> Vec<(ModelRef, TriggerDef)> {
        let entries = self.entries.lock();
        entries
            .iter()
            .flat_map(|e| {
                e.regs
                    .iter()
                    .map(|r| (r.model.clone(), r.trigger.clone()))
            })
            .collect()
    }

    /// Distinct tables with at least one registration, in first-registration
    /// order.
    pub fn tables(&self) -> Vec<String> {
        let entries = self.entries.lock();
        entries.iter().map(|e| e.table.clone()).collect()
    }
}

fn entry_mut<'a>(entries: &'a mut Vec<TableEntry>, table: &str) -> &'a mut TableEntry {
    if let Some(pos) = entries.iter().position(|e| e.table == table) {
        return &mut entries[pos];
    }
    entries.push(TableEntry {
        table: table.to_string(),
        regs: Vec::new(),
    });
    entries.last_mut().unwrap()
}

/// Guard for a temporary registration; releasing it restores the registry
/// to exactly its prior state.
#[must_use = "dropping the guard immediately reverses the registration"]
pub struct ScopedRegistration<'a> {
    registry: &'a Registry,
    table: String,
    name: String,
    shadowed: Option<(usize, Registration)>,
    created_entry: bool,
}

impl ScopedRegistration<'_> {
    /// Release the registration explicitly.
    pub fn release(self) {}
}

impl Drop for ScopedRegistration<'_> {
    fn drop(&mut self) {
        let mut entries = self.registry.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.table == self.table) else {
            return;
        };
        if let Some(pos) = entry.regs.iter().position(|r| r.trigger.name == self.name) {
            entry.regs.remove(pos);
        }
        if let Some((pos, shadowed)) = self.shadowed.take() {
            let pos = pos.min(entry.regs.len());
            entry.regs.insert(pos, shadowed);
        }
        if self.created_entry && entry.regs.is_empty() {
            entries.retain(|e| e.table != self.table);
        }
        debug!(table = %self.table, trigger = %self.name, "scoped registration released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Operation;
    use std::panic::AssertUnwindSafe;

    fn order_model() -> ModelRef {
        ModelRef::new("Order", "orders")
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let model = order_model();

        registry
            .register(&model, TriggerDef::protect("no_deletes", Operation::Delete))
            .unwrap();
        registry
            .register(&model, TriggerDef::protect("no_updates", Operation::Update))
            .unwrap();

        let triggers = registry.triggers_for(&model);
        assert_eq!(triggers.len(), 2);
        // Registration order is preserved.
        assert_eq!(triggers[0].name, "no_deletes");
        assert_eq!(triggers[1].name, "no_updates");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new();
        let model = order_model();

        registry
            .register(&model, TriggerDef::protect("guard", Operation::Delete))
            .unwrap();
        let err = registry
            .register(&model, TriggerDef::protect("guard", Operation::Update))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_duplicate_across_proxy_rejected() {
        let registry = Registry::new();
        let base = order_model();
        let proxy = ModelRef::proxy("OrderProxy", &base);

        registry
            .register(&base, TriggerDef::protect("guard", Operation::Delete))
            .unwrap();
        // Same underlying table, same name: collision.
        let err = registry
            .register(&proxy, TriggerDef::protect("guard", Operation::Update))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_register_model_validates_before_inserting() {
        let registry = Registry::new();
        let model = order_model();

        let err = registry
            .register_model(
                &model,
                [
                    TriggerDef::protect("a", Operation::Delete),
                    TriggerDef::protect("a", Operation::Update),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        // Nothing was partially inserted.
        assert!(registry.triggers_for(&model).is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = Registry::new();
        let model = order_model();

        registry
            .register(&model, TriggerDef::protect("guard", Operation::Delete))
            .unwrap();
        registry.unregister(&model, "guard").unwrap();
        assert!(registry.triggers_for(&model).is_empty());

        let err = registry.unregister(&model, "guard").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_scoped_registration_reverses_on_drop() {
        let registry = Registry::new();
        let model = order_model();
        registry
            .register(&model, TriggerDef::protect("keep", Operation::Delete))
            .unwrap();
        let before = registry.triggers_for(&model);

        {
            let _guard = registry
                .scoped_register(&model, TriggerDef::protect("temp", Operation::Insert))
                .unwrap();
            assert_eq!(registry.triggers_for(&model).len(), 2);
        }

        assert_eq!(registry.triggers_for(&model), before);
    }

    #[test]
    fn test_scoped_registration_reverses_on_panic() {
        let registry = Registry::new();
        let model = order_model();
        let before = registry.triggers_for(&model);

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = registry
                .scoped_register(&model, TriggerDef::protect("temp", Operation::Insert))
                .unwrap();
            panic!("failure inside the scope");
        }));
        assert!(result.is_err());
        assert_eq!(registry.triggers_for(&model), before);
        // The entry created for the scope is gone entirely.
        assert!(registry.tables().is_empty());
    }

    #[test]
    fn test_scoped_registration_restores_shadowed_trigger() {
        let registry = Registry::new();
        let model = order_model();
        let original = TriggerDef::protect("guard", Operation::Delete);
        registry.register(&model, original.clone()).unwrap();

        {
            let replacement = TriggerDef::protect("guard", Operation::Insert | Operation::Update);
            let _guard = registry.scoped_register(&model, replacement.clone()).unwrap();
            assert_eq!(registry.triggers_for(&model), vec![replacement]);
        }

        assert_eq!(registry.triggers_for(&model), vec![original]);
    }

    #[test]
    fn test_deregister_model() {
        let registry = Registry::new();
        let base = order_model();
        let proxy = ModelRef::proxy("OrderProxy", &base);

        registry
            .register(&base, TriggerDef::protect("base_guard", Operation::Delete))
            .unwrap();
        registry
            .register(&proxy, TriggerDef::protect("proxy_guard", Operation::Update))
            .unwrap();

        // Removing the proxy leaves the base model's trigger in place.
        registry.deregister_model(&proxy);
        let remaining = registry.triggers_for(&base);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "base_guard");

        // Removing the managed model drops the whole table entry.
        registry.deregister_model(&base);
        assert!(registry.tables().is_empty());
    }

    #[test]
    fn test_snapshot_order() {
        let registry = Registry::new();
        let orders = order_model();
        let users = ModelRef::new("User", "users");

        registry
            .register(&orders, TriggerDef::protect("a", Operation::Delete))
            .unwrap();
        registry
            .register(&users, TriggerDef::protect("b", Operation::Delete))
            .unwrap();
        registry
            .register(&orders, TriggerDef::protect("c", Operation::Update))
            .unwrap();

        let names: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|(_, t)| t.name)
            .collect();
        assert_eq!(names, ["a", "c", "b"]);
    }
}
