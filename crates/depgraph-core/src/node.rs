//! The [`Node`] contract implemented by every symbol record type.
//!
//! Records are produced once per compiled origin per round by a language
//! front-end and are immutable afterwards. The graph only needs a record's
//! identifier, its kind, its usage edges, and a way to diff it against an
//! earlier version of itself.

use std::fmt;

use crate::diff::Difference;
use crate::id::SymbolId;
use crate::usage::Usage;

/// A versioned snapshot of one symbol's shape.
pub trait Node: Clone + fmt::Debug + Send + Sync + 'static {
    /// Structural difference between two versions of the same record.
    type Diff: Difference;

    fn id(&self) -> &SymbolId;

    /// Record kind discriminator (e.g. `"class"`, `"module"`), used to
    /// filter per-origin listings.
    fn kind(&self) -> &str;

    /// The usage edges this record emits.
    fn usages(&self) -> &[Usage];

    /// Diffs `self` (the current version) against `past`.
    fn difference(&self, past: &Self) -> Self::Diff;

    /// Returns true if any usage edge of this record targets `target`.
    fn uses(&self, target: &SymbolId) -> bool {
        self.usages().iter().any(|u| &u.target == target)
    }
}
