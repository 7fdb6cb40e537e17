//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations (users, connection requests, messages)
//! - Entity models and identifiers

mod database;
mod models;

pub use database::Database;
pub use models::*;

#[cfg(test)]
mod database_test;
