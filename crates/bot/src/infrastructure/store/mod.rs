//! Durable storage: the SQLite key-value store and typed records on top.

mod records;
mod sqlite;

pub use records::{KvAccountRepo, KvServerConfigRepo, KvWorldCache, SCHEMA_VERSION};
pub use sqlite::SqliteKvStore;
