//! Caller-supplied behavior overrides.
//!
//! A closed set of named extension points, registered at setup time and
//! consulted by the gateway before its default dialect logic. An occupied
//! slot fully replaces the default for that call; an empty slot falls
//! through. The registry lives and dies with its gateway.

use crate::records::Record;
use crate::schema::{ColumnDescriptor, TableDescriptor};
use crate::sql::OrderingTerm;
use serde_json::Value as JsonValue;

/// Replacement for the dialect's default session commands: a fixed list,
/// or a function computing one per connection establishment.
pub enum SessionCommands {
    List(Vec<String>),
    Compute(Box<dyn Fn() -> Vec<String> + Send + Sync>),
}

impl SessionCommands {
    pub fn resolve(&self) -> Vec<String> {
        match self {
            Self::List(commands) => commands.clone(),
            Self::Compute(f) => f(),
        }
    }
}

/// Post-processes a raw generated key; `None` keeps the raw key.
pub type GeneratedKeyFn = Box<dyn Fn(&TableDescriptor, &JsonValue) -> Option<JsonValue> + Send + Sync>;

/// Replaces `ColumnsBuilder::select_clause`.
pub type SelectClauseFn = Box<dyn Fn(&TableDescriptor, &[String]) -> String + Send + Sync>;

/// Replaces `ColumnsBuilder::insert_clause` / `update_clause` /
/// `increment_clause` (one slot each, same shape).
pub type ValuesClauseFn = Box<dyn Fn(&TableDescriptor, &Record) -> String + Send + Sync>;

/// Replaces `ColumnsBuilder::order_by_clause`.
pub type OrderByClauseFn = Box<dyn Fn(&TableDescriptor, &[OrderingTerm]) -> String + Send + Sync>;

/// Replaces `ColumnsBuilder::offset_limit_clause`.
pub type OffsetLimitClauseFn = Box<dyn Fn(u64, Option<u64>) -> String + Send + Sync>;

/// Replaces the default value conversion for one direction; `None` falls
/// through to the default conversion for that column.
pub type ValueConversionFn =
    Box<dyn Fn(&ColumnDescriptor, &JsonValue) -> Option<JsonValue> + Send + Sync>;

/// The override registry. All slots default to empty.
#[derive(Default)]
pub struct Overrides {
    pub session_commands: Option<SessionCommands>,
    pub generated_key: Option<GeneratedKeyFn>,
    pub select_clause: Option<SelectClauseFn>,
    pub insert_clause: Option<ValuesClauseFn>,
    pub update_clause: Option<ValuesClauseFn>,
    pub increment_clause: Option<ValuesClauseFn>,
    pub order_by_clause: Option<OrderByClauseFn>,
    pub offset_limit_clause: Option<OffsetLimitClauseFn>,
    /// Input direction: application value to wire value, before writes.
    pub input_value: Option<ValueConversionFn>,
    /// Record direction: wire value to application value, after reads.
    pub record_value: Option<ValueConversionFn>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overrides")
            .field("session_commands", &self.session_commands.is_some())
            .field("generated_key", &self.generated_key.is_some())
            .field("select_clause", &self.select_clause.is_some())
            .field("insert_clause", &self.insert_clause.is_some())
            .field("update_clause", &self.update_clause.is_some())
            .field("increment_clause", &self.increment_clause.is_some())
            .field("order_by_clause", &self.order_by_clause.is_some())
            .field("offset_limit_clause", &self.offset_limit_clause.is_some())
            .field("input_value", &self.input_value.is_some())
            .field("record_value", &self.record_value.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_commands_shapes() {
        let fixed = SessionCommands::List(vec!["SET NAMES utf8mb4;".to_string()]);
        assert_eq!(fixed.resolve(), vec!["SET NAMES utf8mb4;"]);

        let computed = SessionCommands::Compute(Box::new(|| vec!["SELECT 1".to_string()]));
        assert_eq!(computed.resolve(), vec!["SELECT 1"]);
    }

    #[test]
    fn test_registry_defaults_empty() {
        let overrides = Overrides::new();
        assert!(overrides.insert_clause.is_none());
        assert!(overrides.generated_key.is_none());
        let debugged = format!("{:?}", overrides);
        assert!(debugged.contains("insert_clause: false"));
    }
}
