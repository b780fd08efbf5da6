//! The generic CRUD gateway.
//!
//! One gateway owns one logical connection context and turns table-level
//! CRUD intents into dialect-correct parameterized SQL. Every read, write
//! and delete passes through the policy-filter merge: the caller's own
//! condition is conjoined with the externally registered authorization and
//! tenancy filters for the table, in that order, with no way to opt out.
//!
//! Operations take `&mut self`: a gateway serves one unit of work at a
//! time, and concurrent callers need a gateway (and connection) each. Each
//! operation awaits its statement to completion; there is no cancellation.

use crate::config::{ConfigPatch, ConnectionConfig, Driver};
use crate::db::convert::DataConverter;
use crate::db::driver::Connector;
use crate::db::handle::ConnectionHandle;
use crate::error::GatewayResult;
use crate::overrides::{
    GeneratedKeyFn, OffsetLimitClauseFn, OrderByClauseFn, Overrides, SelectClauseFn,
    SessionCommands, ValueConversionFn, ValuesClauseFn,
};
use crate::policy::{NoPolicyFilters, PolicyFilters};
use crate::records::Record;
use crate::schema::TableDescriptor;
use crate::sql::{ColumnsBuilder, Condition, ConditionsBuilder, OrderingTerm, quote};
use serde_json::Value as JsonValue;

pub struct GenericGateway {
    handle: ConnectionHandle,
    columns: ColumnsBuilder,
    conditions: ConditionsBuilder,
    converter: DataConverter,
    policy: Box<dyn PolicyFilters>,
    overrides: Overrides,
}

impl GenericGateway {
    /// Gateway over the production drivers. No connection is opened until
    /// the first operation runs.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::build(ConnectionHandle::new(config))
    }

    /// Gateway over a custom connector (tests, instrumentation).
    pub fn with_connector(config: ConnectionConfig, connector: Box<dyn Connector>) -> Self {
        Self::build(ConnectionHandle::with_connector(config, connector))
    }

    fn build(handle: ConnectionHandle) -> Self {
        let driver = handle.config().driver;
        let mut gateway = Self {
            handle,
            columns: ColumnsBuilder::new(driver),
            conditions: ConditionsBuilder::new(driver),
            converter: DataConverter::new(driver),
            policy: Box::new(NoPolicyFilters),
            overrides: Overrides::new(),
        };
        gateway.refresh_dialect();
        gateway
    }

    /// Swap in the policy filter provider consulted on every operation.
    pub fn set_policy_filters(&mut self, policy: Box<dyn PolicyFilters>) {
        self.policy = policy;
    }

    /// Append a session command, replayed against every physical
    /// connection established from now on.
    pub fn add_session_command(&mut self, command: impl Into<String>) {
        self.handle.add_session_command(command);
    }

    /// Merge a partial configuration and mark the connection for lazy
    /// re-establishment. Builders and session defaults follow the
    /// (possibly new) dialect; appended session commands are kept.
    pub fn reconfigure(&mut self, patch: ConfigPatch) {
        self.handle.reconfigure(patch);
        self.refresh_dialect();
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.handle.config()
    }

    /// Stable identity of the connection target for external caches;
    /// excludes the password.
    pub fn cache_key(&self) -> String {
        self.handle.config().cache_key()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    fn driver_tag(&self) -> Driver {
        self.handle.config().driver
    }

    fn refresh_dialect(&mut self) {
        let driver = self.driver_tag();
        self.columns = ColumnsBuilder::new(driver);
        self.conditions = ConditionsBuilder::new(driver);
        self.converter = DataConverter::new(driver);
        let defaults = match &self.overrides.session_commands {
            Some(commands) => commands.resolve(),
            None => driver
                .session_commands()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        self.handle.set_session_defaults(defaults);
    }

    // -- override registration ------------------------------------------

    pub fn set_session_commands_override(&mut self, commands: SessionCommands) {
        self.overrides.session_commands = Some(commands);
        self.refresh_dialect();
    }

    pub fn set_generated_key_override(&mut self, f: GeneratedKeyFn) {
        self.overrides.generated_key = Some(f);
    }

    pub fn set_select_clause_override(&mut self, f: SelectClauseFn) {
        self.overrides.select_clause = Some(f);
    }

    pub fn set_insert_clause_override(&mut self, f: ValuesClauseFn) {
        self.overrides.insert_clause = Some(f);
    }

    pub fn set_update_clause_override(&mut self, f: ValuesClauseFn) {
        self.overrides.update_clause = Some(f);
    }

    pub fn set_increment_clause_override(&mut self, f: ValuesClauseFn) {
        self.overrides.increment_clause = Some(f);
    }

    pub fn set_order_by_clause_override(&mut self, f: OrderByClauseFn) {
        self.overrides.order_by_clause = Some(f);
    }

    pub fn set_offset_limit_clause_override(&mut self, f: OffsetLimitClauseFn) {
        self.overrides.offset_limit_clause = Some(f);
    }

    pub fn set_input_value_override(&mut self, f: ValueConversionFn) {
        self.overrides.input_value = Some(f);
    }

    pub fn set_record_value_override(&mut self, f: ValueConversionFn) {
        self.overrides.record_value = Some(f);
    }

    // -- operations -----------------------------------------------------

    /// Insert one row from the supplied column values and return its
    /// primary key. A key supplied by the caller is returned as-is with no
    /// retrieval round trip; otherwise the dialect's generated-key path
    /// runs. An empty value map is a no-op returning JSON null.
    pub async fn create_single(
        &mut self,
        table: &TableDescriptor,
        mut column_values: Record,
    ) -> GatewayResult<JsonValue> {
        if column_values.is_empty() {
            return Ok(JsonValue::Null);
        }
        self.converter.convert_input_values(
            table,
            &mut column_values,
            self.overrides.input_value.as_ref(),
        );
        let insert = match &self.overrides.insert_clause {
            Some(f) => f(table, &column_values),
            None => self.columns.insert_clause(table, &column_values)?,
        };
        let params = self.converter.bind_params(table, &column_values);
        let sql = format!("INSERT INTO {} {}", quote(table.name()), insert);

        if let Some(pk_value) = column_values.get(table.pk_name()) {
            if !pk_value.is_null() {
                let pk_value = pk_value.clone();
                self.handle.execute(&sql, &params).await?;
                return Ok(pk_value);
            }
        }

        let raw_key = match self.driver_tag() {
            // No RETURNING clause in this family: ask for the key right
            // after the INSERT. Correct only while nothing else runs on
            // this physical connection in between, which holding `&mut
            // self` across both statements guarantees.
            Driver::MySql => {
                self.handle.execute(&sql, &params).await?;
                self.handle.fetch_scalar("SELECT LAST_INSERT_ID()", &[]).await?
            }
            Driver::PgSql | Driver::SqlSrv => self.handle.fetch_scalar(&sql, &params).await?,
        };

        let raw_key = if self.driver_tag() == Driver::SqlSrv
            && table.pk().map(|pk| pk.type_tag == "bigint").unwrap_or(false)
        {
            coerce_integer(raw_key)
        } else {
            raw_key
        };

        if let Some(f) = &self.overrides.generated_key {
            if let Some(post_processed) = f(table, &raw_key) {
                return Ok(post_processed);
            }
        }
        Ok(raw_key)
    }

    /// Fetch at most one row by primary key; `None` when nothing matches.
    pub async fn select_single(
        &mut self,
        table: &TableDescriptor,
        column_names: &[String],
        id: &JsonValue,
    ) -> GatewayResult<Option<Record>> {
        let select = match &self.overrides.select_clause {
            Some(f) => f(table, column_names),
            None => self.columns.select_clause(table, column_names)?,
        };
        let condition = self.merge_policy(table.name(), self.pk_condition(table, id));
        let mut params = Vec::new();
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!(
            "SELECT {} FROM {}{}",
            select,
            quote(table.name()),
            where_clause
        );
        let mut records = self.handle.fetch_rows(&sql, &params).await?;
        if records.is_empty() {
            return Ok(None);
        }
        records.truncate(1);
        self.converter.convert_records(
            table,
            column_names,
            &mut records,
            self.overrides.record_value.as_ref(),
        );
        Ok(records.pop())
    }

    /// Fetch the rows whose primary key is in `ids`, in dialect-defined
    /// order. An empty id list returns an empty list without touching the
    /// database (`IN ()` is not valid SQL everywhere).
    pub async fn select_multiple(
        &mut self,
        table: &TableDescriptor,
        column_names: &[String],
        ids: &[JsonValue],
    ) -> GatewayResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = match &self.overrides.select_clause {
            Some(f) => f(table, column_names),
            None => self.columns.select_clause(table, column_names)?,
        };
        let condition = self.merge_policy(
            table.name(),
            Condition::in_list(table.pk_name(), ids.to_vec()),
        );
        let mut params = Vec::new();
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!(
            "SELECT {} FROM {}{}",
            select,
            quote(table.name()),
            where_clause
        );
        let mut records = self.handle.fetch_rows(&sql, &params).await?;
        self.converter.convert_records(
            table,
            column_names,
            &mut records,
            self.overrides.record_value.as_ref(),
        );
        Ok(records)
    }

    /// Count the rows matching `condition` (plus policy filters).
    pub async fn select_count(
        &mut self,
        table: &TableDescriptor,
        condition: Condition,
    ) -> GatewayResult<u64> {
        let condition = self.merge_policy(table.name(), condition);
        let mut params = Vec::new();
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", quote(table.name()), where_clause);
        let scalar = self.handle.fetch_scalar(&sql, &params).await?;
        Ok(count_of(scalar))
    }

    /// Fetch matching rows with ordering and pagination. A limit of
    /// `Some(0)` means "no rows requested" and returns an empty list
    /// without executing a query; `None` means no limit.
    pub async fn select_all(
        &mut self,
        table: &TableDescriptor,
        column_names: &[String],
        condition: Condition,
        ordering: &[OrderingTerm],
        offset: u64,
        limit: Option<u64>,
    ) -> GatewayResult<Vec<Record>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let select = match &self.overrides.select_clause {
            Some(f) => f(table, column_names),
            None => self.columns.select_clause(table, column_names)?,
        };
        let condition = self.merge_policy(table.name(), condition);
        let mut params = Vec::new();
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let order_by = match &self.overrides.order_by_clause {
            Some(f) => f(table, ordering),
            None => self.columns.order_by_clause(table, ordering)?,
        };
        let offset_limit = match &self.overrides.offset_limit_clause {
            Some(f) => f(offset, limit),
            None => self.columns.offset_limit_clause(offset, limit),
        };
        let sql = format!(
            "SELECT {} FROM {}{}{}{}",
            select,
            quote(table.name()),
            where_clause,
            order_by,
            offset_limit
        );
        let mut records = self.handle.fetch_rows(&sql, &params).await?;
        self.converter.convert_records(
            table,
            column_names,
            &mut records,
            self.overrides.record_value.as_ref(),
        );
        Ok(records)
    }

    /// Update the supplied columns of one row by primary key; returns the
    /// affected row count. An empty value map returns 0 without executing.
    pub async fn update_single(
        &mut self,
        table: &TableDescriptor,
        mut column_values: Record,
        id: &JsonValue,
    ) -> GatewayResult<u64> {
        if column_values.is_empty() {
            return Ok(0);
        }
        self.converter.convert_input_values(
            table,
            &mut column_values,
            self.overrides.input_value.as_ref(),
        );
        let set_clause = match &self.overrides.update_clause {
            Some(f) => f(table, &column_values),
            None => self.columns.update_clause(table, &column_values)?,
        };
        let condition = self.merge_policy(table.name(), self.pk_condition(table, id));
        let mut params = self.converter.bind_params(table, &column_values);
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote(table.name()),
            set_clause,
            where_clause
        );
        self.handle.execute(&sql, &params).await
    }

    /// Delete one row by primary key; returns the affected row count.
    pub async fn delete_single(
        &mut self,
        table: &TableDescriptor,
        id: &JsonValue,
    ) -> GatewayResult<u64> {
        let condition = self.merge_policy(table.name(), self.pk_condition(table, id));
        let mut params = Vec::new();
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!("DELETE FROM {}{}", quote(table.name()), where_clause);
        self.handle.execute(&sql, &params).await
    }

    /// Add each supplied delta onto its column (`col = col + ?`) for one
    /// row by primary key. An empty value map returns 0 without executing.
    pub async fn increment_single(
        &mut self,
        table: &TableDescriptor,
        mut column_values: Record,
        id: &JsonValue,
    ) -> GatewayResult<u64> {
        if column_values.is_empty() {
            return Ok(0);
        }
        self.converter.convert_input_values(
            table,
            &mut column_values,
            self.overrides.input_value.as_ref(),
        );
        let set_clause = match &self.overrides.increment_clause {
            Some(f) => f(table, &column_values),
            None => self.columns.increment_clause(table, &column_values)?,
        };
        let condition = self.merge_policy(table.name(), self.pk_condition(table, id));
        let mut params = self.converter.bind_params(table, &column_values);
        let where_clause = self
            .conditions
            .where_clause(table, &condition, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote(table.name()),
            set_clause,
            where_clause
        );
        self.handle.execute(&sql, &params).await
    }

    // -- internals ------------------------------------------------------

    fn pk_condition(&self, table: &TableDescriptor, id: &JsonValue) -> Condition {
        Condition::eq(table.pk_name(), id.clone())
    }

    /// Conjoin the table's registered policy filters onto `condition`:
    /// caller condition, then authorization, then tenancy. Runs on every
    /// operation; this is the row-level security enforcement point.
    fn merge_policy(&self, table_name: &str, condition: Condition) -> Condition {
        let mut condition = condition;
        if let Some(authorization) = self.policy.authorization(table_name) {
            condition = condition.and(authorization);
        }
        if let Some(tenancy) = self.policy.tenancy(table_name) {
            condition = condition.and(tenancy);
        }
        condition
    }
}

impl std::fmt::Debug for GenericGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericGateway")
            .field("handle", &self.handle)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// A COUNT(*) scalar as u64, whatever shape the driver returned it in.
fn count_of(value: JsonValue) -> u64 {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|i| i.max(0) as u64))
            .unwrap_or(0),
        JsonValue::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// A generated key as a JSON integer where the driver returned text.
fn coerce_integer(value: JsonValue) -> JsonValue {
    match &value {
        JsonValue::Number(_) => value,
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or(value),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_of_shapes() {
        assert_eq!(count_of(JsonValue::from(5)), 5);
        assert_eq!(count_of(JsonValue::from(-2)), 0);
        assert_eq!(count_of(JsonValue::String("12".to_string())), 12);
        assert_eq!(count_of(JsonValue::Null), 0);
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_integer(JsonValue::String("42".to_string())), JsonValue::from(42));
        assert_eq!(coerce_integer(JsonValue::from(7)), JsonValue::from(7));
        let untouched = JsonValue::String("abc".to_string());
        assert_eq!(coerce_integer(untouched.clone()), untouched);
    }
}
