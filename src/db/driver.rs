//! Statement execution toward the underlying drivers.
//!
//! [`StatementDriver`] is the narrow execution interface the gateway talks
//! to: run a session command, fetch rows, fetch a scalar, execute a write.
//! [`Connector`] opens one physical connection for a configuration. The
//! native implementations sit in per-dialect submodules: sqlx single
//! connections for MySQL and PostgreSQL, a tiberius client for SQL Server.
//!
//! Generated SQL arrives with `?` placeholders in every dialect. MySQL
//! binds those directly; the PostgreSQL and SQL Server drivers substitute
//! their native positional markers (`$n`, `@Pn`) first. Generated SQL
//! never contains `?` outside a placeholder position — all values are
//! bound, never inlined.

use crate::config::{ConnectionConfig, Driver};
use crate::error::GatewayResult;
use crate::records::{Record, SqlParam};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::info;

/// One physical connection able to run parameterized statements.
#[async_trait]
pub trait StatementDriver: Send {
    /// Run a session-setup command, discarding any result.
    async fn run_command(&mut self, sql: &str) -> GatewayResult<()>;

    /// Execute a query and fetch all rows as ordered column-name/value maps.
    async fn fetch_rows(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<Vec<Record>>;

    /// Execute a query and return the first column of the first row
    /// (JSON null when no row matches).
    async fn fetch_scalar(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<JsonValue>;

    /// Execute a write statement and return the affected row count.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64>;
}

/// Opens physical connections; injectable so tests can run the gateway
/// against a scripted driver.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &ConnectionConfig) -> GatewayResult<Box<dyn StatementDriver>>;
}

/// The production connector: sqlx for MySQL/PostgreSQL, tiberius for
/// SQL Server.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeConnector;

#[async_trait]
impl Connector for NativeConnector {
    async fn open(&self, config: &ConnectionConfig) -> GatewayResult<Box<dyn StatementDriver>> {
        info!(
            driver = %config.driver,
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Opening connection"
        );
        match config.driver {
            Driver::MySql => Ok(Box::new(mysql::MySqlDriver::open(config).await?)),
            Driver::PgSql => Ok(Box::new(postgres::PgDriver::open(config).await?)),
            Driver::SqlSrv => Ok(Box::new(mssql::MssqlDriver::open(config).await?)),
        }
    }
}

/// Replace each `?` with `{prefix}{n}`, numbering from 1.
fn number_placeholders(sql: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push_str(prefix);
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Logical category of a driver-reported column type, shared by the sqlx
/// row decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    DateTime,
}

fn categorize(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }
    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" || lower == "timetz" {
        return TypeCategory::Time;
    }
    if lower.contains("timestamp") || lower.contains("datetime") {
        return TypeCategory::DateTime;
    }
    TypeCategory::Text
}

fn base64_string(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn scalar_of(rows: Vec<Record>) -> JsonValue {
    rows.into_iter()
        .next()
        .and_then(|row| row.into_iter().next().map(|(_, value)| value))
        .unwrap_or(JsonValue::Null)
}

mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlTypeInfo, MySqlValueRef};
    use sqlx::{Column, Connection, Decode, Row, Type, TypeInfo};
    use std::str::FromStr;
    use tracing::debug;

    /// Raw DECIMAL/NUMERIC text, preserving the exact database
    /// representation instead of forcing a lossy float.
    struct RawDecimal(String);

    impl Type<sqlx::MySql> for RawDecimal {
        fn type_info() -> MySqlTypeInfo {
            <String as Type<sqlx::MySql>>::type_info()
        }

        fn compatible(ty: &MySqlTypeInfo) -> bool {
            let name = ty.name().to_lowercase();
            name.contains("decimal") || name.contains("numeric")
        }
    }

    impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
        fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
            let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
            Ok(RawDecimal(s.to_string()))
        }
    }

    pub(super) struct MySqlDriver {
        conn: MySqlConnection,
    }

    impl MySqlDriver {
        pub(super) async fn open(config: &ConnectionConfig) -> GatewayResult<Self> {
            let options = MySqlConnectOptions::from_str(&config.effective_dsn())?
                .charset("utf8mb4");
            let conn = MySqlConnection::connect_with(&options).await?;
            Ok(Self { conn })
        }
    }

    fn bind<'q>(
        query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
        param: &'q SqlParam,
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::UInt(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::String(v) => query.bind(v.as_str()),
            SqlParam::Bytes(v) => query.bind(v.as_slice()),
        }
    }

    #[async_trait]
    impl StatementDriver for MySqlDriver {
        async fn run_command(&mut self, sql: &str) -> GatewayResult<()> {
            debug!(sql = %sql, "Running session command");
            sqlx::query(sql).execute(&mut self.conn).await?;
            Ok(())
        }

        async fn fetch_rows(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<Vec<Record>> {
            debug!(sql = %sql, params = params.len(), "Fetching rows");
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind(query, param);
            }
            let rows = query.fetch_all(&mut self.conn).await?;
            Ok(rows.iter().map(record_from_row).collect())
        }

        async fn fetch_scalar(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<JsonValue> {
            Ok(scalar_of(self.fetch_rows(sql, params).await?))
        }

        async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64> {
            debug!(sql = %sql, params = params.len(), "Executing write");
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind(query, param);
            }
            let result = query.execute(&mut self.conn).await?;
            Ok(result.rows_affected())
        }
    }

    fn record_from_row(row: &MySqlRow) -> Record {
        row.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = decode_column(row, idx, categorize(col.type_info().name()));
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => {
                if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
                    return JsonValue::from(v);
                }
                if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
                    return JsonValue::from(v);
                }
                JsonValue::Null
            }
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => {
                if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
                    return float_value(v);
                }
                if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
                    return float_value(v as f64);
                }
                JsonValue::Null
            }
            TypeCategory::Decimal => row
                .try_get::<Option<RawDecimal>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.0))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<Option<serde_json::Value>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| base64_string(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Time => row
                .try_get::<Option<chrono::NaiveTime>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::DateTime => {
                if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
                    return JsonValue::String(v.to_string());
                }
                if let Ok(Some(v)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
                    return JsonValue::String(v.naive_utc().to_string());
                }
                JsonValue::Null
            }
            TypeCategory::Uuid | TypeCategory::Text => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow};
    use sqlx::{Column, Connection, Row, TypeInfo};
    use std::str::FromStr;
    use tracing::debug;

    pub(super) struct PgDriver {
        conn: PgConnection,
    }

    impl PgDriver {
        pub(super) async fn open(config: &ConnectionConfig) -> GatewayResult<Self> {
            let options = PgConnectOptions::from_str(&config.effective_dsn())?
                .options([("client_encoding", "UTF8")]);
            let conn = PgConnection::connect_with(&options).await?;
            Ok(Self { conn })
        }
    }

    fn bind<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        param: &'q SqlParam,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            // PostgreSQL has no unsigned integers; values beyond i64 go
            // through their decimal text form.
            SqlParam::UInt(v) => match i64::try_from(*v) {
                Ok(i) => query.bind(i),
                Err(_) => query.bind(v.to_string()),
            },
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::String(v) => query.bind(v.as_str()),
            SqlParam::Bytes(v) => query.bind(v.as_slice()),
        }
    }

    #[async_trait]
    impl StatementDriver for PgDriver {
        async fn run_command(&mut self, sql: &str) -> GatewayResult<()> {
            debug!(sql = %sql, "Running session command");
            sqlx::query(sql).execute(&mut self.conn).await?;
            Ok(())
        }

        async fn fetch_rows(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<Vec<Record>> {
            let sql = number_placeholders(sql, "$");
            debug!(sql = %sql, params = params.len(), "Fetching rows");
            let mut query = sqlx::query(&sql);
            for param in params {
                query = bind(query, param);
            }
            let rows = query.fetch_all(&mut self.conn).await?;
            Ok(rows.iter().map(record_from_row).collect())
        }

        async fn fetch_scalar(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<JsonValue> {
            Ok(scalar_of(self.fetch_rows(sql, params).await?))
        }

        async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64> {
            let sql = number_placeholders(sql, "$");
            debug!(sql = %sql, params = params.len(), "Executing write");
            let mut query = sqlx::query(&sql);
            for param in params {
                query = bind(query, param);
            }
            let result = query.execute(&mut self.conn).await?;
            Ok(result.rows_affected())
        }
    }

    fn record_from_row(row: &PgRow) -> Record {
        row.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = decode_column(row, idx, categorize(col.type_info().name()));
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => {
                if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
                    return JsonValue::from(v);
                }
                if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
                    return JsonValue::from(v);
                }
                if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
                    return JsonValue::from(v);
                }
                JsonValue::Null
            }
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => {
                if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
                    return float_value(v);
                }
                if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
                    return float_value(v as f64);
                }
                JsonValue::Null
            }
            TypeCategory::Decimal => {
                // NUMERIC arrives as text through the same raw-text route
                // the MySQL driver uses; sqlx decodes it to String here.
                row.try_get::<Option<String>, _>(idx)
                    .ok()
                    .flatten()
                    .map(JsonValue::String)
                    .unwrap_or(JsonValue::Null)
            }
            TypeCategory::Json => row
                .try_get::<Option<serde_json::Value>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Uuid => row
                .try_get::<Option<uuid::Uuid>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| base64_string(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Time => row
                .try_get::<Option<chrono::NaiveTime>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::DateTime => {
                if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
                    return JsonValue::String(v.to_string());
                }
                if let Ok(Some(v)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
                    return JsonValue::String(v.naive_utc().to_string());
                }
                JsonValue::Null
            }
            TypeCategory::Text => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
        }
    }
}

mod mssql {
    use super::*;
    use tiberius::{ColumnType, Config, Row, ToSql};
    use tokio::net::TcpStream;
    use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
    use tracing::debug;

    pub(super) struct MssqlDriver {
        client: tiberius::Client<Compat<TcpStream>>,
    }

    impl MssqlDriver {
        pub(super) async fn open(config: &ConnectionConfig) -> GatewayResult<Self> {
            let tds_config = Config::from_ado_string(&config.effective_dsn())?;
            let tcp = TcpStream::connect(tds_config.get_addr())
                .await
                .map_err(|e| crate::error::GatewayError::connection(e.to_string()))?;
            tcp.set_nodelay(true)
                .map_err(|e| crate::error::GatewayError::connection(e.to_string()))?;
            let client = tiberius::Client::connect(tds_config, tcp.compat_write()).await?;
            Ok(Self { client })
        }
    }

    fn to_sql_params(params: &[SqlParam]) -> Vec<Box<dyn ToSql>> {
        params
            .iter()
            .map(|p| -> Box<dyn ToSql> {
                match p {
                    SqlParam::Null => Box::new(Option::<String>::None),
                    SqlParam::Bool(v) => Box::new(*v),
                    SqlParam::Int(v) => Box::new(*v),
                    SqlParam::UInt(v) => match i64::try_from(*v) {
                        Ok(i) => Box::new(i),
                        Err(_) => Box::new(v.to_string()),
                    },
                    SqlParam::Float(v) => Box::new(*v),
                    SqlParam::String(v) => Box::new(v.clone()),
                    SqlParam::Bytes(v) => Box::new(v.clone()),
                }
            })
            .collect()
    }

    #[async_trait]
    impl StatementDriver for MssqlDriver {
        async fn run_command(&mut self, sql: &str) -> GatewayResult<()> {
            debug!(sql = %sql, "Running session command");
            self.client.simple_query(sql).await?.into_results().await?;
            Ok(())
        }

        async fn fetch_rows(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<Vec<Record>> {
            let sql = number_placeholders(sql, "@P");
            debug!(sql = %sql, params = params.len(), "Fetching rows");
            let owned = to_sql_params(params);
            let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();
            let stream = self.client.query(sql.as_str(), &refs).await?;
            let rows = stream.into_first_result().await?;
            Ok(rows.iter().map(record_from_row).collect())
        }

        async fn fetch_scalar(
            &mut self,
            sql: &str,
            params: &[SqlParam],
        ) -> GatewayResult<JsonValue> {
            Ok(scalar_of(self.fetch_rows(sql, params).await?))
        }

        async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64> {
            let sql = number_placeholders(sql, "@P");
            debug!(sql = %sql, params = params.len(), "Executing write");
            let owned = to_sql_params(params);
            let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();
            let result = self.client.execute(sql.as_str(), &refs).await?;
            Ok(result.total())
        }
    }

    fn record_from_row(row: &Row) -> Record {
        let columns: Vec<(String, ColumnType)> = row
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), col.column_type()))
            .collect();
        columns
            .into_iter()
            .enumerate()
            .map(|(idx, (name, col_type))| (name, decode_column(row, idx, col_type)))
            .collect()
    }

    fn decode_column(row: &Row, idx: usize, col_type: ColumnType) -> JsonValue {
        match col_type {
            ColumnType::Null => JsonValue::Null,
            ColumnType::Int1 => row
                .try_get::<u8, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::from)
                .unwrap_or(JsonValue::Null),
            ColumnType::Int2 => row
                .try_get::<i16, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::from)
                .unwrap_or(JsonValue::Null),
            ColumnType::Int4 => row
                .try_get::<i32, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::from)
                .unwrap_or(JsonValue::Null),
            ColumnType::Int8 => row
                .try_get::<i64, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::from)
                .unwrap_or(JsonValue::Null),
            ColumnType::Intn => row
                .try_get::<i64, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::from)
                .or_else(|| {
                    row.try_get::<i32, _>(idx)
                        .ok()
                        .flatten()
                        .map(JsonValue::from)
                })
                .unwrap_or(JsonValue::Null),
            ColumnType::Float4 => row
                .try_get::<f32, _>(idx)
                .ok()
                .flatten()
                .map(|v| float_value(v as f64))
                .unwrap_or(JsonValue::Null),
            ColumnType::Float8 => row
                .try_get::<f64, _>(idx)
                .ok()
                .flatten()
                .map(float_value)
                .unwrap_or(JsonValue::Null),
            ColumnType::Floatn => row
                .try_get::<f64, _>(idx)
                .ok()
                .flatten()
                .map(float_value)
                .or_else(|| {
                    row.try_get::<f32, _>(idx)
                        .ok()
                        .flatten()
                        .map(|v| float_value(v as f64))
                })
                .unwrap_or(JsonValue::Null),
            ColumnType::Decimaln | ColumnType::Numericn => row
                .try_get::<tiberius::numeric::Numeric, _>(idx)
                .ok()
                .flatten()
                .map(|n| float_value(f64::from(n)))
                .unwrap_or(JsonValue::Null),
            ColumnType::Money | ColumnType::Money4 => row
                .try_get::<f64, _>(idx)
                .ok()
                .flatten()
                .map(float_value)
                .unwrap_or(JsonValue::Null),
            ColumnType::Bit | ColumnType::Bitn => row
                .try_get::<bool, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            ColumnType::BigVarChar
            | ColumnType::BigChar
            | ColumnType::NVarchar
            | ColumnType::NChar
            | ColumnType::Text
            | ColumnType::NText => row
                .try_get::<&str, _>(idx)
                .ok()
                .flatten()
                .map(|s| JsonValue::String(s.to_string()))
                .unwrap_or(JsonValue::Null),
            ColumnType::Datetime | ColumnType::Datetime2 | ColumnType::Datetimen
            | ColumnType::Datetime4 => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .ok()
                .flatten()
                .map(|dt| JsonValue::String(dt.to_string()))
                .unwrap_or(JsonValue::Null),
            ColumnType::DatetimeOffsetn => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                .ok()
                .flatten()
                .map(|dt| JsonValue::String(dt.to_rfc3339()))
                .unwrap_or(JsonValue::Null),
            ColumnType::Daten => row
                .try_get::<chrono::NaiveDate, _>(idx)
                .ok()
                .flatten()
                .map(|d| JsonValue::String(d.to_string()))
                .unwrap_or(JsonValue::Null),
            ColumnType::Timen => row
                .try_get::<chrono::NaiveTime, _>(idx)
                .ok()
                .flatten()
                .map(|t| JsonValue::String(t.to_string()))
                .unwrap_or(JsonValue::Null),
            ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => row
                .try_get::<&[u8], _>(idx)
                .ok()
                .flatten()
                .map(base64_string)
                .unwrap_or(JsonValue::Null),
            ColumnType::Guid => row
                .try_get::<tiberius::Uuid, _>(idx)
                .ok()
                .flatten()
                .map(|u| JsonValue::String(u.to_string()))
                .unwrap_or(JsonValue::Null),
            _ => row
                .try_get::<&str, _>(idx)
                .ok()
                .flatten()
                .map(|s| JsonValue::String(s.to_string()))
                .unwrap_or(JsonValue::Null),
        }
    }
}
