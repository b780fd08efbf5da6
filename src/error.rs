//! Error types for the gateway.
//!
//! Three kinds are distinguished: connection establishment failures,
//! statement execution failures (with the driver's diagnostic text), and
//! caller precondition violations detected before any SQL is built. No
//! error is retried here; transient-failure policy belongs to the caller,
//! which may `reconfigure` and re-run the whole operation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("statement failed: {message}")]
    Statement {
        message: String,
        /// e.g. "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl GatewayError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a statement error with optional SQLSTATE.
    pub fn statement(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// The SQLSTATE reported by the driver, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Statement { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => GatewayError::connection(msg.to_string()),
            sqlx::Error::Io(io_err) => GatewayError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => {
                GatewayError::connection(format!("TLS error: {}", tls_err))
            }
            sqlx::Error::Protocol(msg) => {
                GatewayError::connection(format!("protocol error: {}", msg))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                GatewayError::connection("connection unavailable")
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                GatewayError::statement(db_err.message().to_string(), code)
            }
            other => GatewayError::statement(other.to_string(), None),
        }
    }
}

impl From<tiberius::error::Error> for GatewayError {
    fn from(err: tiberius::error::Error) -> Self {
        match &err {
            tiberius::error::Error::Io { .. } => {
                GatewayError::connection(format!("I/O error: {}", err))
            }
            tiberius::error::Error::Routing { .. } => {
                GatewayError::connection(format!("routing error: {}", err))
            }
            tiberius::error::Error::Server(token) => {
                GatewayError::statement(token.message().to_string(), Some(token.code().to_string()))
            }
            _ => GatewayError::statement(err.to_string(), None),
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
