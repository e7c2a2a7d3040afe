//! Storage error types for depgraph-storage.
//!
//! [`StorageError`] covers backend I/O failures, schema migration, codec
//! failures while reading persisted values, and transaction misuse.

use thiserror::Error;

use depgraph_core::CoreError;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite reported an error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A key or value failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// `begin` was called while a transaction was already open.
    #[error("a transaction is already active")]
    TransactionActive,

    /// `commit` or `rollback` was called with no open transaction.
    #[error("no active transaction")]
    NoTransaction,
}
