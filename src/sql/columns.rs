//! Column-list clause generation.
//!
//! SELECT lists, INSERT column/value clauses, UPDATE and increment SET
//! clauses, ORDER BY, and the dialect's pagination clause. Inputs are the
//! reflected table plus caller-supplied column names/values; outputs are
//! SQL fragments with `?` placeholders.

use crate::config::Driver;
use crate::error::{GatewayError, GatewayResult};
use crate::records::Record;
use crate::schema::TableDescriptor;
use crate::sql::quote;

/// Sort direction for one ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One ORDER BY term; an unspecified direction sorts ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub column: String,
    pub direction: Option<Direction>,
}

impl OrderingTerm {
    /// Term with no explicit direction (sorts ascending).
    pub fn of(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Ascending),
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Descending),
        }
    }
}

pub struct ColumnsBuilder {
    driver: Driver,
}

impl ColumnsBuilder {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// Quoted, comma-joined SELECT list. An empty request selects every
    /// reflected column; explicit names are filtered to reflected ones and
    /// must leave at least one.
    pub fn select_clause(
        &self,
        table: &TableDescriptor,
        column_names: &[String],
    ) -> GatewayResult<String> {
        let names: Vec<String> = if column_names.is_empty() {
            table.column_names()
        } else {
            column_names
                .iter()
                .filter(|name| table.has_column(name))
                .cloned()
                .collect()
        };
        if names.is_empty() {
            return Err(GatewayError::invalid_operation(format!(
                "no selectable columns among {:?} for table '{}'",
                column_names,
                table.name()
            )));
        }
        Ok(names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(","))
    }

    /// `("a","b") VALUES (?,?)` over exactly the supplied columns, in their
    /// given order, plus the dialect's generated-key clause: `RETURNING`
    /// for PostgreSQL, `OUTPUT inserted.` for SQL Server, nothing for
    /// MySQL (which retrieves the key with a follow-up query).
    pub fn insert_clause(
        &self,
        table: &TableDescriptor,
        column_values: &Record,
    ) -> GatewayResult<String> {
        let names = self.supplied_columns(table, column_values)?;
        let quoted: Vec<String> = names.iter().map(|n| quote(n)).collect();
        let placeholders = vec!["?"; names.len()].join(",");
        let pk = quote(table.pk_name());
        Ok(match self.driver {
            Driver::MySql => format!("({}) VALUES ({})", quoted.join(","), placeholders),
            Driver::PgSql => format!(
                "({}) VALUES ({}) RETURNING {}",
                quoted.join(","),
                placeholders,
                pk
            ),
            Driver::SqlSrv => format!(
                "({}) OUTPUT inserted.{} VALUES ({})",
                quoted.join(","),
                pk,
                placeholders
            ),
        })
    }

    /// `"a"=?,"b"=?` over exactly the supplied columns.
    pub fn update_clause(
        &self,
        table: &TableDescriptor,
        column_values: &Record,
    ) -> GatewayResult<String> {
        let names = self.supplied_columns(table, column_values)?;
        Ok(names
            .iter()
            .map(|n| format!("{}=?", quote(n)))
            .collect::<Vec<_>>()
            .join(","))
    }

    /// `"a"="a"+?,...` — each supplied column is increased by its delta.
    pub fn increment_clause(
        &self,
        table: &TableDescriptor,
        column_values: &Record,
    ) -> GatewayResult<String> {
        let names = self.supplied_columns(table, column_values)?;
        Ok(names
            .iter()
            .map(|n| {
                let quoted = quote(n);
                format!("{}={}+?", quoted, quoted)
            })
            .collect::<Vec<_>>()
            .join(","))
    }

    /// ` ORDER BY "a" ASC,"b" DESC`, or nothing for an empty term list.
    /// Ordering by a column the table does not have is a caller error.
    pub fn order_by_clause(
        &self,
        table: &TableDescriptor,
        ordering: &[OrderingTerm],
    ) -> GatewayResult<String> {
        if ordering.is_empty() {
            return Ok(String::new());
        }
        let mut terms = Vec::with_capacity(ordering.len());
        for term in ordering {
            if !table.has_column(&term.column) {
                return Err(GatewayError::invalid_operation(format!(
                    "cannot order by unknown column '{}' of table '{}'",
                    term.column,
                    table.name()
                )));
            }
            let direction = match term.direction {
                Some(Direction::Descending) => "DESC",
                _ => "ASC",
            };
            terms.push(format!("{} {}", quote(&term.column), direction));
        }
        Ok(format!(" ORDER BY {}", terms.join(",")))
    }

    /// The dialect's pagination clause. `limit` of `None` means no limit
    /// and renders nothing (the offset is dropped with it); the gateway
    /// short-circuits `Some(0)` before SQL generation.
    pub fn offset_limit_clause(&self, offset: u64, limit: Option<u64>) -> String {
        let Some(limit) = limit else {
            return String::new();
        };
        match self.driver {
            Driver::MySql => format!(" LIMIT {}, {}", offset, limit),
            Driver::PgSql => format!(" LIMIT {} OFFSET {}", limit, offset),
            Driver::SqlSrv => format!(
                " OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                offset, limit
            ),
        }
    }

    /// The supplied column names in map order, each validated against the
    /// table before SQL is built.
    fn supplied_columns(
        &self,
        table: &TableDescriptor,
        column_values: &Record,
    ) -> GatewayResult<Vec<String>> {
        let mut names = Vec::with_capacity(column_values.len());
        for name in column_values.keys() {
            if !table.has_column(name) {
                return Err(GatewayError::invalid_operation(format!(
                    "value for unknown column '{}' of table '{}'",
                    name,
                    table.name()
                )));
            }
            names.push(name.clone());
        }
        Ok(names)
    }
}
