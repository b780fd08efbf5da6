//! Dialect-aware SQL fragment generation.
//!
//! Everything in this module is pure string/parameter assembly; statement
//! execution lives in `crate::db`. Generated fragments use `?` as the
//! placeholder in every dialect; the statement drivers substitute their
//! native positional markers at bind time.

pub mod columns;
pub mod condition;
pub mod conditions;

pub use columns::{ColumnsBuilder, Direction, OrderingTerm};
pub use condition::{Condition, Operator};
pub use conditions::ConditionsBuilder;

/// Quote an identifier with double quotes.
///
/// Double quotes are valid in every supported dialect: natively in
/// PostgreSQL and SQL Server, and in MySQL through the ANSI sql_mode the
/// default session commands establish.
pub(crate) fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
