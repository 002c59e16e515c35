//! SQLite backend for the Lab Note Ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Opening a store runs the
//! schema migrator; a failed migration fails the open, so a process never
//! serves traffic against a half-migrated schema.

mod encode;
mod migrate;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use migrate::{CURRENT_VERSION, MigrationReport};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
