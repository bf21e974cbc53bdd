//! Command implementations.

use crate::{Args, Command};
use rusqlite::Connection;
use std::fs;
use trigsync_core::{
    apply, install_all, prune, sweep, synthesize, uninstall_all, MigrationState, Registry,
    Settings,
};

/// Dispatch one parsed invocation.
pub fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let conn = Connection::open(&args.db)?;
    let registry = load_registry(args)?;

    match &args.command {
        Command::Install => {
            install_all(&conn, &registry).map_err(|e| format!("{e}\n{}", e.details()))?;
            println!("installed {} trigger(s)", registry.snapshot().len());
        }
        Command::Uninstall => {
            uninstall_all(&conn, &registry).map_err(|e| format!("{e}\n{}", e.details()))?;
            println!("uninstalled {} trigger(s)", registry.snapshot().len());
        }
        Command::Ls => {
            for report in sweep(&conn, &registry)? {
                println!("{:<12} {:<30} {}", report.status, report.trigger, report.model);
            }
        }
        Command::Prune => {
            let dropped = prune(&conn, &registry)?;
            for name in &dropped {
                println!("dropped {name}");
            }
            println!("pruned {} trigger(s)", dropped.len());
        }
        Command::Sync {
            state,
            no_install,
            no_migrations,
        } => {
            let mut settings = Settings::default();
            if *no_install {
                settings = settings.without_install_on_migrate();
            }
            if *no_migrations {
                settings = settings.without_migrations();
            }

            // With migration tracking off the synthesizer is not engaged;
            // the declared set is installed directly.
            if !settings.migrations_enabled {
                install_all(&conn, &registry).map_err(|e| format!("{e}\n{}", e.details()))?;
                println!("installed {} trigger(s)", registry.snapshot().len());
                return Ok(());
            }

            let recorded = if state.exists() {
                MigrationState::from_json(&fs::read_to_string(state)?)?
            } else {
                MigrationState::new()
            };
            let current = MigrationState::from_registry(&registry);

            let ops = synthesize(&recorded, &current)?;
            if ops.is_empty() {
                println!("no changes");
                return Ok(());
            }

            apply(&conn, &ops, &settings)?;
            fs::write(state, current.to_json()?)?;
            for op in &ops {
                println!("{op:?}");
            }
            println!("applied {} operation(s)", ops.len());
        }
    }

    Ok(())
}

fn load_registry(args: &Args) -> Result<Registry, Box<dyn std::error::Error>> {
    let declared = MigrationState::from_json(&fs::read_to_string(&args.declarations)?)?;
    let registry = Registry::new();
    for model_state in declared.models {
        registry.register_model(&model_state.model, model_state.triggers)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use trigsync_core::{status, InstallStatus, ModelRef, Operation, TriggerDef};

    fn setup(dir: &TempDir) -> (PathBuf, PathBuf) {
        let db = dir.path().join("app.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE orders (id INTEGER PRIMARY KEY, qty INTEGER)")
            .unwrap();

        let declared = MigrationState::new().with_model(
            ModelRef::new("Order", "orders"),
            [TriggerDef::protect("guard", Operation::Delete)],
        );
        let declarations = dir.path().join("triggers.json");
        fs::write(&declarations, declared.to_json().unwrap()).unwrap();
        (db, declarations)
    }

    fn guard_status(db: &PathBuf) -> InstallStatus {
        let conn = Connection::open(db).unwrap();
        let model = ModelRef::new("Order", "orders");
        let def = TriggerDef::protect("guard", Operation::Delete);
        status(&conn, &model, &def).unwrap()
    }

    #[test]
    fn test_sync_applies_and_records_state() {
        let dir = tempfile::tempdir().unwrap();
        let (db, declarations) = setup(&dir);
        let state = dir.path().join("state.json");

        let args = Args {
            db: db.clone(),
            declarations,
            command: Command::Sync {
                state: state.clone(),
                no_install: false,
                no_migrations: false,
            },
        };
        run(&args).unwrap();

        assert_eq!(guard_status(&db), InstallStatus::Installed);
        let recorded = MigrationState::from_json(&fs::read_to_string(&state).unwrap()).unwrap();
        assert_eq!(recorded.models.len(), 1);
        assert_eq!(recorded.models[0].triggers[0].name, "guard");

        // A second sync against the recorded state finds nothing to do.
        run(&args).unwrap();
    }

    #[test]
    fn test_sync_no_install_records_state_without_ddl() {
        let dir = tempfile::tempdir().unwrap();
        let (db, declarations) = setup(&dir);
        let state = dir.path().join("state.json");

        let args = Args {
            db: db.clone(),
            declarations,
            command: Command::Sync {
                state: state.clone(),
                no_install: true,
                no_migrations: false,
            },
        };
        run(&args).unwrap();

        // The new snapshot is recorded, but no trigger DDL ran.
        assert!(state.exists());
        assert_eq!(guard_status(&db), InstallStatus::Uninstalled);
    }

    #[test]
    fn test_sync_no_migrations_installs_directly() {
        let dir = tempfile::tempdir().unwrap();
        let (db, declarations) = setup(&dir);
        let state = dir.path().join("state.json");

        let args = Args {
            db: db.clone(),
            declarations,
            command: Command::Sync {
                state: state.clone(),
                no_install: false,
                no_migrations: true,
            },
        };
        run(&args).unwrap();

        // Bypassing migration tracking installs the declared set and leaves
        // no recorded state behind.
        assert_eq!(guard_status(&db), InstallStatus::Installed);
        assert!(!state.exists());
    }
}
