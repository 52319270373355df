//! Session store implementations for Banter.

pub mod sqlite;

pub use sqlite::SqliteSessionStore;
