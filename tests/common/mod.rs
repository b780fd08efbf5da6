//! Shared test harness: a scripted statement driver.
//!
//! The gateway's execution seam is a trait, so the tests run every CRUD
//! path against an in-memory driver that records each statement (with its
//! bound parameters and the physical connection it ran on) and answers
//! from a scripted response queue.

#![allow(dead_code)]

use async_trait::async_trait;
use crudgate::{
    ColumnDescriptor, ConnectionConfig, Connector, Driver, GatewayResult, GenericGateway, Record,
    SqlParam, StatementDriver, TableDescriptor,
};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted answer, consumed in order.
pub enum FakeResponse {
    Rows(Vec<Record>),
    Scalar(JsonValue),
    Affected(u64),
}

/// One captured statement.
#[derive(Debug, Clone)]
pub struct Statement {
    /// 1-based index of the physical connection it ran on.
    pub connection: usize,
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Default)]
pub struct FakeState {
    pub connects: usize,
    /// Host field of each opened connection's config, in open order.
    pub opened_hosts: Vec<String>,
    /// Session commands, with the connection they ran on.
    pub commands: Vec<(usize, String)>,
    pub statements: Vec<Statement>,
    pub responses: VecDeque<FakeResponse>,
}

impl FakeState {
    pub fn script(&mut self, response: FakeResponse) {
        self.responses.push_back(response);
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.statements.iter().map(|s| s.sql.clone()).collect()
    }
}

pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new() -> (Self, Arc<Mutex<FakeState>>) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, config: &ConnectionConfig) -> GatewayResult<Box<dyn StatementDriver>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        state.opened_hosts.push(config.host.clone());
        let connection = state.connects;
        Ok(Box::new(FakeDriver {
            state: Arc::clone(&self.state),
            connection,
        }))
    }
}

struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
    connection: usize,
}

impl FakeDriver {
    fn record(&self, sql: &str, params: &[SqlParam]) {
        self.state.lock().unwrap().statements.push(Statement {
            connection: self.connection,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

#[async_trait]
impl StatementDriver for FakeDriver {
    async fn run_command(&mut self, sql: &str) -> GatewayResult<()> {
        self.state
            .lock()
            .unwrap()
            .commands
            .push((self.connection, sql.to_string()));
        Ok(())
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<Vec<Record>> {
        self.record(sql, params);
        let response = self.state.lock().unwrap().responses.pop_front();
        match response {
            Some(FakeResponse::Rows(rows)) => Ok(rows),
            Some(FakeResponse::Scalar(value)) => {
                let mut row = Record::new();
                row.insert("value".to_string(), value);
                Ok(vec![row])
            }
            Some(FakeResponse::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    async fn fetch_scalar(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<JsonValue> {
        self.record(sql, params);
        let response = self.state.lock().unwrap().responses.pop_front();
        match response {
            Some(FakeResponse::Scalar(value)) => Ok(value),
            Some(FakeResponse::Rows(rows)) => Ok(rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next().map(|(_, v)| v))
                .unwrap_or(JsonValue::Null)),
            Some(FakeResponse::Affected(_)) | None => Ok(JsonValue::Null),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64> {
        self.record(sql, params);
        let response = self.state.lock().unwrap().responses.pop_front();
        match response {
            Some(FakeResponse::Affected(count)) => Ok(count),
            Some(_) | None => Ok(1),
        }
    }
}

/// Gateway wired to a fresh fake driver. Run with `RUST_LOG=debug` to see
/// the statement trace.
pub fn gateway(driver: Driver) -> (GenericGateway, Arc<Mutex<FakeState>>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let (connector, state) = FakeConnector::new();
    let config = ConnectionConfig::new(driver, "localhost", 0, "shop", "app", "secret");
    let gateway = GenericGateway::with_connector(config, Box::new(connector));
    (gateway, state)
}

/// The `books` table used throughout the scenarios; includes the policy
/// columns so registered filters have something to bite on.
pub fn books_table() -> TableDescriptor {
    TableDescriptor::new(
        "books",
        vec![
            ColumnDescriptor::new("id", "integer", false),
            ColumnDescriptor::new("title", "varchar", false),
            ColumnDescriptor::new("qty", "integer", true),
            ColumnDescriptor::new("owner_id", "integer", true),
            ColumnDescriptor::new("tenant_id", "varchar", true),
        ],
        "id",
    )
}

pub fn record(pairs: &[(&str, JsonValue)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
