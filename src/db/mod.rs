//! Database layer
//!
//! Database abstraction for the Studiobase server. Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration; everything above this layer
//! works against the `DatabasePool` trait and the repository traits in
//! [`repositories`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase};
