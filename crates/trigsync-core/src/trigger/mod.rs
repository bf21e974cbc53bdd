//! Trigger value model: definitions, conditions, and DDL rendering.

mod condition;
mod def;
mod render;

pub use condition::{CompareOp, Condition, RowRef, Value};
pub use def::{Operation, Operations, Timing, TriggerDef};
pub use render::{
    extract_marker, parse_physical, physical_name, render_create, render_drop, signature,
    CreateStatement, MANAGED_PREFIX,
};
