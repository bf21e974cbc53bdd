//! Trigger definitions.

use super::condition::{validate_identifier, Condition};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// When the trigger fires relative to the row operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timing {
    /// Fire before the row operation.
    Before,
    /// Fire after the row operation.
    After,
    /// Fire instead of the row operation (views only).
    InsteadOf,
}

impl Timing {
    /// SQL keyword for this timing.
    pub fn keyword(&self) -> &'static str {
        match self {
            Timing::Before => "BEFORE",
            Timing::After => "AFTER",
            Timing::InsteadOf => "INSTEAD OF",
        }
    }
}

/// A single row operation a trigger can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Row insertion.
    Insert,
    /// Row update.
    Update,
    /// Row deletion.
    Delete,
}

impl Operation {
    /// SQL keyword for this operation.
    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    /// Lowercase suffix used in physical trigger names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// A set of row operations, combinable with `|`.
///
/// One logical trigger may fire on several operations; the installer renders
/// one physical trigger per member of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Operations {
    insert: bool,
    update: bool,
    delete: bool,
}

impl Operations {
    /// The empty set.
    pub fn none() -> Self {
        Self::default()
    }

    /// A set containing a single operation.
    pub fn only(op: Operation) -> Self {
        Self::none() | op
    }

    /// All three operations.
    pub fn all() -> Self {
        Operation::Insert | Operation::Update | Operation::Delete
    }

    /// Whether the set contains the given operation.
    pub fn contains(&self, op: Operation) -> bool {
        match op {
            Operation::Insert => self.insert,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        !(self.insert || self.update || self.delete)
    }

    /// Iterate members in a fixed order (Insert, Update, Delete).
    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        [Operation::Insert, Operation::Update, Operation::Delete]
            .into_iter()
            .filter(|op| self.contains(*op))
    }
}

impl From<Operation> for Operations {
    fn from(op: Operation) -> Self {
        Operations::only(op)
    }
}

impl BitOr for Operation {
    type Output = Operations;

    fn bitor(self, rhs: Operation) -> Operations {
        Operations::only(self) | rhs
    }
}

impl BitOr<Operation> for Operations {
    type Output = Operations;

    fn bitor(mut self, rhs: Operation) -> Operations {
        match rhs {
            Operation::Insert => self.insert = true,
            Operation::Update => self.update = true,
            Operation::Delete => self.delete = true,
        }
        self
    }
}

impl BitOr for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operations) -> Operations {
        Operations {
            insert: self.insert || rhs.insert,
            update: self.update || rhs.update,
            delete: self.delete || rhs.delete,
        }
    }
}

impl std::fmt::Display for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for op in self.iter() {
            if !first {
                write!(f, " OR ")?;
            }
            write!(f, "{}", op.keyword())?;
            first = false;
        }
        Ok(())
    }
}

/// An immutable trigger declaration.
///
/// Two definitions are semantically equal iff every field is equal; a
/// definition sharing a name with a semantically unequal one signals an
/// update to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    /// Logical trigger name, unique per model.
    pub name: String,
    /// When the trigger fires.
    pub timing: Timing,
    /// Row operations the trigger fires on.
    pub operations: Operations,
    /// Optional condition gating the trigger body.
    pub condition: Option<Condition>,
    /// Opaque SQL statement list run when the trigger fires.
    pub function: String,
}

impl TriggerDef {
    /// Create a new trigger definition.
    pub fn new(
        name: impl Into<String>,
        timing: Timing,
        operations: impl Into<Operations>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            timing,
            operations: operations.into(),
            condition: None,
            function: function.into(),
        }
    }

    /// A protective trigger that rejects the given operations outright.
    pub fn protect(name: impl Into<String>, operations: impl Into<Operations>) -> Self {
        let name = name.into();
        let function = format!(
            "SELECT RAISE(ABORT, 'trigsync: blocked by trigger {name}');"
        );
        Self::new(name, Timing::Before, operations, function)
    }

    /// Attach a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Validate the declaration without touching the database.
    pub fn validate(&self) -> Result<(), Error> {
        validate_identifier(&self.name)?;
        if self.operations.is_empty() {
            return Err(Error::Configuration(format!(
                "trigger {} declares no operations",
                self.name
            )));
        }
        if self.function.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "trigger {} has an empty function body",
                self.name
            )));
        }
        if let Some(condition) = &self.condition {
            condition.to_sql()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::condition::{CompareOp, RowRef, Value};

    #[test]
    fn test_operations_union() {
        let ops = Operation::Insert | Operation::Update;
        assert!(ops.contains(Operation::Insert));
        assert!(ops.contains(Operation::Update));
        assert!(!ops.contains(Operation::Delete));
        assert_eq!(ops.iter().count(), 2);
    }

    #[test]
    fn test_operations_display() {
        let ops = Operation::Insert | Operation::Delete;
        assert_eq!(ops.to_string(), "INSERT OR DELETE");
        assert_eq!(Operations::only(Operation::Update).to_string(), "UPDATE");
    }

    #[test]
    fn test_protect_builder() {
        let trigger = TriggerDef::protect("no_deletes", Operation::Delete);
        assert_eq!(trigger.timing, Timing::Before);
        assert!(trigger.function.contains("RAISE(ABORT"));
        assert!(trigger.function.contains("no_deletes"));
        trigger.validate().unwrap();
    }

    #[test]
    fn test_semantic_equality() {
        let a = TriggerDef::protect("guard", Operation::Insert | Operation::Update);
        let b = TriggerDef::protect("guard", Operation::Insert | Operation::Update);
        assert_eq!(a, b);

        // Narrowing the operation mask is a semantic change.
        let c = TriggerDef::protect("guard", Operation::Update);
        assert_ne!(a, c);
    }

    #[test]
    fn test_validate_rejects_bad_declarations() {
        let empty_ops = TriggerDef::new("t", Timing::After, Operations::none(), "SELECT 1;");
        assert!(matches!(
            empty_ops.validate(),
            Err(Error::Configuration(_))
        ));

        let bad_name = TriggerDef::protect("has space", Operation::Insert);
        assert!(matches!(bad_name.validate(), Err(Error::Configuration(_))));

        let bad_condition = TriggerDef::protect("ok", Operation::Update).with_condition(
            Condition::compare(RowRef::New, "no--good", CompareOp::Eq, Value::Integer(1)),
        );
        assert!(matches!(
            bad_condition.validate(),
            Err(Error::Configuration(_))
        ));
    }
}
