//! Long-term memory: append-only incident log in SQLite.

pub mod connection;
pub mod deadline;
pub mod incidents;
pub mod metrics;
pub mod schema;

pub use connection::Database;
pub use deadline::CallGuard;
