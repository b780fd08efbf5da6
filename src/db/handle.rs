//! The lazily-connected, reconfigurable connection handle.
//!
//! A handle starts `Unconnected` and opens its physical connection on the
//! first statement. `reconfigure` merges a partial configuration and
//! discards any live connection, so the next statement pays the
//! establishment cost again against the new target. Session commands
//! accumulate across reconfigurations and are replayed, in order, against
//! every newly established physical connection; sessions already
//! established are not retroactively patched.

use crate::config::{ConfigPatch, ConnectionConfig};
use crate::db::driver::{Connector, NativeConnector, StatementDriver};
use crate::error::GatewayResult;
use crate::records::{Record, SqlParam};
use serde_json::Value as JsonValue;
use tracing::warn;

pub struct ConnectionHandle {
    config: ConnectionConfig,
    connector: Box<dyn Connector>,
    /// Dialect defaults (or their override), refreshed by the owner when
    /// the dialect can have changed.
    session_defaults: Vec<String>,
    /// Caller-appended commands; survive reconfiguration, never removed.
    session_commands: Vec<String>,
    driver: Option<Box<dyn StatementDriver>>,
}

impl ConnectionHandle {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, Box::new(NativeConnector))
    }

    pub fn with_connector(config: ConnectionConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            session_defaults: Vec::new(),
            session_commands: Vec::new(),
            driver: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// Replace the dialect-default session commands replayed before the
    /// appended ones.
    pub fn set_session_defaults(&mut self, commands: Vec<String>) {
        self.session_defaults = commands;
    }

    /// Append a session command; it runs against every physical connection
    /// established from now on.
    pub fn add_session_command(&mut self, command: impl Into<String>) {
        self.session_commands.push(command.into());
    }

    /// Merge `patch` into the configuration and drop any live physical
    /// connection; the next statement reconnects lazily.
    pub fn reconfigure(&mut self, patch: ConfigPatch) {
        self.config.apply(patch);
        self.driver = None;
    }

    /// The live driver, establishing the physical connection on first use
    /// and replaying the session command list against it.
    async fn driver(&mut self) -> GatewayResult<&mut Box<dyn StatementDriver>> {
        if self.driver.is_none() {
            let mut driver = self.connector.open(&self.config).await?;
            for command in self.session_defaults.iter().chain(&self.session_commands) {
                if let Err(err) = driver.run_command(command).await {
                    warn!(command = %command, error = %err, "Session command failed");
                    return Err(err);
                }
            }
            self.driver = Some(driver);
        }
        match self.driver.as_mut() {
            Some(driver) => Ok(driver),
            None => Err(crate::error::GatewayError::connection(
                "connection unavailable",
            )),
        }
    }

    pub async fn fetch_rows(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> GatewayResult<Vec<Record>> {
        self.driver().await?.fetch_rows(sql, params).await
    }

    pub async fn fetch_scalar(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> GatewayResult<JsonValue> {
        self.driver().await?.fetch_scalar(sql, params).await
    }

    pub async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> GatewayResult<u64> {
        self.driver().await?.execute(sql, params).await
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("driver", &self.config.driver)
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .field("connected", &self.driver.is_some())
            .field("session_commands", &self.session_commands.len())
            .finish()
    }
}
