//! DDL rendering and canonical signatures.
//!
//! Every installed trigger is tagged two ways so that catalog inspection can
//! tell managed triggers apart from user-authored ones: the physical trigger
//! name carries the `trigsync__` prefix, and the body carries a marker
//! comment embedding the canonical signature of the declaration it was
//! rendered from.

use super::def::{Operation, TriggerDef};
use crate::error::Error;
use crate::trigger::condition::quote_identifier;

/// Prefix on every physical trigger name owned by this system.
pub const MANAGED_PREFIX: &str = "trigsync__";

/// Marker comment prefix embedded in installed trigger bodies.
const MARKER_PREFIX: &str = "-- trigsync:";

/// Length of the truncated hex signature.
const SIGNATURE_LEN: usize = 16;

/// A single rendered CREATE TRIGGER statement.
#[derive(Debug, Clone)]
pub struct CreateStatement {
    /// Physical trigger name.
    pub name: String,
    /// Full DDL text.
    pub sql: String,
}

/// Physical trigger name for one (logical name, operation) pair.
pub fn physical_name(logical: &str, op: Operation) -> String {
    format!("{MANAGED_PREFIX}{logical}__{}", op.suffix())
}

/// Recover the logical name from a physical trigger name, if it is ours.
pub fn parse_physical(physical: &str) -> Option<&str> {
    let rest = physical.strip_prefix(MANAGED_PREFIX)?;
    let (logical, suffix) = rest.rsplit_once("__")?;
    matches!(suffix, "insert" | "update" | "delete").then_some(logical)
}

/// Canonical signature of a declaration against a table.
///
/// Deterministic over every semantic field and nothing else; whitespace in
/// the function body is normalized per line so reformatting does not read as
/// an update.
pub fn signature(def: &TriggerDef, table: &str) -> Result<String, Error> {
    let condition = match &def.condition {
        Some(c) => c.to_sql()?,
        None => String::new(),
    };
    let function: String = def
        .function
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let operations = def.operations.to_string();
    let mut hasher = blake3::Hasher::new();
    for part in [
        table,
        def.name.as_str(),
        def.timing.keyword(),
        operations.as_str(),
        condition.as_str(),
        function.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    let digest = hasher.finalize();
    Ok(hex::encode(digest.as_bytes())[..SIGNATURE_LEN].to_string())
}

/// Extract the signature marker from an installed trigger's stored SQL.
pub fn extract_marker(sql: &str) -> Option<&str> {
    sql.lines().find_map(|line| {
        line.trim()
            .strip_prefix(MARKER_PREFIX)
            .map(|rest| rest.trim())
    })
}

/// Render the CREATE TRIGGER statements for a declaration.
///
/// One statement per operation in the mask; each runs separately so a
/// failure installing one physical trigger does not mask the others.
pub fn render_create(def: &TriggerDef, table: &str) -> Result<Vec<CreateStatement>, Error> {
    def.validate()?;
    let sig = signature(def, table)?;
    let when_clause = match &def.condition {
        Some(c) => format!("WHEN ({})\n", c.to_sql()?),
        None => String::new(),
    };

    let mut body = def.function.trim().to_string();
    if !body.ends_with(';') {
        body.push(';');
    }

    let mut statements = Vec::new();
    for op in def.operations.iter() {
        let name = physical_name(&def.name, op);
        let sql = format!(
            "CREATE TRIGGER {trigger} {timing} {operation} ON {table}\n\
             FOR EACH ROW\n\
             {when_clause}BEGIN\n\
             {MARKER_PREFIX}{sig}\n\
             {body}\n\
             END",
            trigger = quote_identifier(&name),
            timing = def.timing.keyword(),
            operation = op.keyword(),
            table = quote_identifier(table),
        );
        statements.push(CreateStatement { name, sql });
    }
    Ok(statements)
}

/// Render a DROP statement for a physical trigger.
pub fn render_drop(physical: &str) -> String {
    format!("DROP TRIGGER IF EXISTS {}", quote_identifier(physical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::condition::{CompareOp, Condition, RowRef, Value};
    use crate::trigger::def::Timing;

    fn guard() -> TriggerDef {
        TriggerDef::protect("guard", Operation::Insert | Operation::Update)
    }

    #[test]
    fn test_physical_name_round_trip() {
        let name = physical_name("protect_deletes", Operation::Delete);
        assert_eq!(name, "trigsync__protect_deletes__delete");
        assert_eq!(parse_physical(&name), Some("protect_deletes"));
    }

    #[test]
    fn test_parse_physical_rejects_foreign_triggers() {
        assert_eq!(parse_physical("user_trigger"), None);
        assert_eq!(parse_physical("trigsync__no_suffix"), None);
        assert_eq!(parse_physical("trigsync__t__truncate"), None);
    }

    #[test]
    fn test_signature_deterministic() {
        let a = signature(&guard(), "orders").unwrap();
        let b = signature(&guard(), "orders").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), SIGNATURE_LEN);
    }

    #[test]
    fn test_signature_covers_semantic_fields() {
        let base = signature(&guard(), "orders").unwrap();

        let narrowed = TriggerDef::protect("guard", Operation::Update);
        assert_ne!(signature(&narrowed, "orders").unwrap(), base);

        let mut retimed = guard();
        retimed.timing = Timing::After;
        assert_ne!(signature(&retimed, "orders").unwrap(), base);

        let conditioned = guard().with_condition(Condition::compare(
            RowRef::New,
            "qty",
            CompareOp::Gt,
            Value::Integer(0),
        ));
        assert_ne!(signature(&conditioned, "orders").unwrap(), base);

        assert_ne!(signature(&guard(), "invoices").unwrap(), base);
    }

    #[test]
    fn test_signature_ignores_function_whitespace() {
        let mut reformatted = guard();
        reformatted.function = format!("  {}  \n", guard().function);
        assert_eq!(
            signature(&reformatted, "orders").unwrap(),
            signature(&guard(), "orders").unwrap()
        );
    }

    #[test]
    fn test_render_create_one_statement_per_operation() {
        let statements = render_create(&guard(), "orders").unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].name, "trigsync__guard__insert");
        assert_eq!(statements[1].name, "trigsync__guard__update");

        for statement in &statements {
            assert!(statement.sql.starts_with("CREATE TRIGGER"));
            assert!(statement.sql.contains("ON \"orders\""));
            assert!(statement.sql.contains("FOR EACH ROW"));
            let sig = signature(&guard(), "orders").unwrap();
            assert_eq!(extract_marker(&statement.sql), Some(sig.as_str()));
        }
    }

    #[test]
    fn test_render_create_with_condition() {
        let def = TriggerDef::protect("special", Operation::Update).with_condition(
            Condition::compare(RowRef::New, "char_field", CompareOp::Eq, Value::text("%")),
        );
        let statements = render_create(&def, "test_model").unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0]
            .sql
            .contains("WHEN (NEW.\"char_field\" = '%')"));
    }

    #[test]
    fn test_render_drop() {
        assert_eq!(
            render_drop("trigsync__guard__insert"),
            "DROP TRIGGER IF EXISTS \"trigsync__guard__insert\""
        );
    }
}
