//! Database Backends - Executors that run query criteria
//!
//! The relation layer only sees [`QueryExecutor`]. `PostgresExecutor` runs on
//! a sqlx pool; `MemoryExecutor` evaluates the same criteria in process.

pub mod core;
pub mod memory;
pub mod postgres;

pub use self::core::QueryExecutor;
pub use memory::{ExecutedStatement, MemoryExecutor, StatementKind};
pub use postgres::PostgresExecutor;
