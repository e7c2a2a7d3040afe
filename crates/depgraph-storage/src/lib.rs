//! Persistent key -> value(s) maps for the dependency graph.
//!
//! Provides the byte-level [`MapStore`] backend contract, the
//! [`InMemoryStore`] and [`SqliteStore`] backends, and the typed
//! [`PersistentMap`] / [`PersistentMultiMap`] handles that layer codecs on
//! top of a named map.
//!
//! # Architecture
//!
//! - **Backends** store sets of opaque byte values under opaque byte keys,
//!   grouped into named maps, and expose `begin`/`commit`/`rollback` so a
//!   whole integrate step is all-or-nothing.
//! - **Typed maps** encode keys and values through [`depgraph_core::Codec`]s
//!   and implement the diff-driven update that avoids full rewrites of
//!   monotonically growing value sets.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: MapStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema and migration setup
//! - [`sqlite`]: SqliteStore implementation
//! - [`maps`]: typed map handles and [`MapFactory`]

pub mod error;
pub mod maps;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use maps::{MapFactory, PersistentMap, PersistentMultiMap};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::MapStore;
