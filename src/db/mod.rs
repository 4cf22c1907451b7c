//! Persistence
//!
//! [`pool`] opens SQLite (default) or MySQL, [`migrations`] creates the schema
//! and seeds the default categories, stats and method steps, and
//! [`repositories`] holds one repository per entity with SQL for both drivers.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
