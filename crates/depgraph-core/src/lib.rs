//! Core data model for the incremental dependency graph.
//!
//! # Modules
//!
//! - [`id`]: stable symbol and origin identifiers
//! - [`usage`]: usage edges emitted by symbol records
//! - [`node`]: the [`Node`] contract every symbol record implements
//! - [`diff`]: structural differencing of records and value sets
//! - [`codec`]: the serialization codec layer used by persistent storage
//! - [`symbol`]: a general-purpose [`Symbol`] record
//! - [`error`]: [`CoreError`]

pub mod codec;
pub mod diff;
pub mod error;
pub mod id;
pub mod node;
pub mod symbol;
pub mod usage;

pub use codec::{Codec, Externalizable, OrderedCodec};
pub use diff::{deep_diff, set_diff, sorted_diff, Change, Difference, SetDiff, Specifier};
pub use error::CoreError;
pub use id::{OriginId, SymbolId};
pub use node::Node;
pub use symbol::{Symbol, SymbolDiff};
pub use usage::Usage;
