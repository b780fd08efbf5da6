//! Row-level policy filters.
//!
//! Authorization and multi-tenancy middleware register extra WHERE
//! fragments per table; the gateway conjoins them onto every operation's
//! own condition, unconditionally. The lookup is an injected dependency,
//! not a process-wide store, so request-scoped providers are possible.

use crate::sql::Condition;
use std::collections::HashMap;

/// Lookup of externally supplied row filters, by table name.
///
/// Merge order on every operation: caller condition, then the
/// authorization filter, then the tenancy filter.
pub trait PolicyFilters: Send + Sync {
    /// Row-level authorization filter for a table, if any.
    fn authorization(&self, table: &str) -> Option<Condition>;

    /// Tenant-isolation filter for a table, if any.
    fn tenancy(&self, table: &str) -> Option<Condition>;
}

/// The no-filter provider; the default for a freshly built gateway.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPolicyFilters;

impl PolicyFilters for NoPolicyFilters {
    fn authorization(&self, _table: &str) -> Option<Condition> {
        None
    }

    fn tenancy(&self, _table: &str) -> Option<Condition> {
        None
    }
}

/// Map-backed provider for setup-time registration.
#[derive(Debug, Default, Clone)]
pub struct StaticPolicyFilters {
    authorization: HashMap<String, Condition>,
    tenancy: HashMap<String, Condition>,
}

impl StaticPolicyFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authorization filter for a table.
    pub fn authorize(mut self, table: impl Into<String>, condition: Condition) -> Self {
        self.authorization.insert(table.into(), condition);
        self
    }

    /// Register a tenancy filter for a table.
    pub fn isolate(mut self, table: impl Into<String>, condition: Condition) -> Self {
        self.tenancy.insert(table.into(), condition);
        self
    }
}

impl PolicyFilters for StaticPolicyFilters {
    fn authorization(&self, table: &str) -> Option<Condition> {
        self.authorization.get(table).cloned()
    }

    fn tenancy(&self, table: &str) -> Option<Condition> {
        self.tenancy.get(table).cloned()
    }
}
