//! The persisted dependency graph, its changesets, and read-only views.
//!
//! # Architecture
//!
//! - [`Graph`] stores `origin -> records`, `record -> origins`, and one
//!   [`DependencyIndex`] per registered [`IndexSpec`] in a shared
//!   [`depgraph_storage::MapStore`].
//! - [`Delta`] is the changeset of one round, laid out like the graph but
//!   kept in memory.
//! - Writes happen only inside an [`Integration`]; [`SharedGraph`] keeps
//!   readers out while one is open.
//! - [`CompositeIndex`], [`FilteredIndex`], and [`CompositeGraph`] are
//!   query-time views and implement only the read half of the index API.
//!
//! # Modules
//!
//! - [`view`]: [`GraphView`] and [`ReferenceIndex`] read contracts
//! - [`index`]: index definitions and the persisted reverse index
//! - [`composite`]: union and filter views
//! - [`delta`]: the per-round changeset
//! - [`graph`]: the persisted graph and integrate transaction
//! - [`shared`]: reader/writer handle
//! - [`config`]: path mapping and the configuration bundle
//! - [`error`]: [`GraphError`]

pub mod composite;
pub mod config;
pub mod delta;
pub mod error;
pub mod graph;
pub mod index;
pub mod shared;
mod tables;
pub mod view;

pub use composite::{CompositeGraph, CompositeIndex, FilteredIndex};
pub use config::{GraphConfiguration, PathMapper, RelativePathMapper};
pub use delta::Delta;
pub use error::GraphError;
pub use graph::{Graph, Integrable, Integration};
pub use index::{BackDependencyIndex, DependencyIndex, IndexSpec, DEPENDING_NODES};
pub use shared::SharedGraph;
pub use view::{GraphView, ReferenceIndex};
