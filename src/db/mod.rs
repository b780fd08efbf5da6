//! Connection lifecycle and statement execution.
//!
//! - `driver`: the narrow execution interface plus the native sqlx and
//!   tiberius implementations
//! - `handle`: the lazy, reconfigurable connection wrapper
//! - `convert`: value conversion between application and wire shapes
//! - `gateway`: the CRUD primitives on top of all of it

pub mod convert;
pub mod driver;
pub mod gateway;
pub mod handle;

pub use convert::DataConverter;
pub use driver::{Connector, NativeConnector, StatementDriver};
pub use gateway::GenericGateway;
pub use handle::ConnectionHandle;
