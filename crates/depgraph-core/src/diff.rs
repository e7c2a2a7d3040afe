//! Structural differencing.
//!
//! [`deep_diff`] splits two record collections into added, removed, and
//! changed records keyed by [`SymbolId`]. [`set_diff`] and [`sorted_diff`]
//! compare plain value sets and back the diff-driven update of persistent
//! multi-valued maps.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::codec::OrderedCodec;
use crate::id::SymbolId;
use crate::node::Node;

/// Result of diffing two versions of a record.
pub trait Difference: fmt::Debug {
    fn unchanged(&self) -> bool;
}

/// One record present in both collections whose shape differs.
#[derive(Debug)]
pub struct Change<'a, N: Node> {
    pub past: &'a N,
    pub now: &'a N,
    pub diff: N::Diff,
}

/// Records split by how they differ between two collections.
#[derive(Debug)]
pub struct Specifier<'a, N: Node> {
    pub added: Vec<&'a N>,
    pub removed: Vec<&'a N>,
    pub changed: Vec<Change<'a, N>>,
}

impl<N: Node> Specifier<'_, N> {
    pub fn unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Diffs `past` against `now` by record identifier.
///
/// Output order follows the input order, so the result is deterministic for
/// deterministic inputs.
pub fn deep_diff<'a, N: Node>(past: &'a [N], now: &'a [N]) -> Specifier<'a, N> {
    let past_by_id: IndexMap<&SymbolId, &N> = past.iter().map(|n| (n.id(), n)).collect();
    let now_by_id: IndexMap<&SymbolId, &N> = now.iter().map(|n| (n.id(), n)).collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    for (id, &current) in &now_by_id {
        match past_by_id.get(id) {
            None => added.push(current),
            Some(&previous) => {
                let diff = current.difference(previous);
                if !diff.unchanged() {
                    changed.push(Change {
                        past: previous,
                        now: current,
                        diff,
                    });
                }
            }
        }
    }
    let removed = past_by_id
        .iter()
        .filter(|(id, _)| !now_by_id.contains_key(*id))
        .map(|(_, &n)| n)
        .collect();

    Specifier {
        added,
        removed,
        changed,
    }
}

/// Difference between two value sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> SetDiff<T> {
    pub fn unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// True when the new set only grew.
    pub fn is_pure_addition(&self) -> bool {
        self.removed.is_empty()
    }
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        SetDiff {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Hash-based diff of `past` against `now`. Duplicates are ignored.
pub fn set_diff<T: Eq + Hash + Clone>(past: &[T], now: &[T]) -> SetDiff<T> {
    let past_set: HashSet<&T> = past.iter().collect();
    let now_set: HashSet<&T> = now.iter().collect();
    let mut seen = HashSet::new();
    let added = now
        .iter()
        .filter(|v| !past_set.contains(v) && seen.insert(*v))
        .cloned()
        .collect();
    let mut seen = HashSet::new();
    let removed = past
        .iter()
        .filter(|v| !now_set.contains(v) && seen.insert(*v))
        .cloned()
        .collect();
    SetDiff { added, removed }
}

/// Merge-based diff using the codec's order. Inputs need not be sorted;
/// the outputs are sorted.
pub fn sorted_diff<T: Clone>(codec: &dyn OrderedCodec<T>, past: &[T], now: &[T]) -> SetDiff<T> {
    let past = sorted_refs(codec, past);
    let now = sorted_refs(codec, now);

    let mut diff = SetDiff::default();
    let (mut i, mut j) = (0, 0);
    while i < past.len() && j < now.len() {
        match codec.compare(past[i], now[j]) {
            Ordering::Less => {
                diff.removed.push(past[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                diff.added.push(now[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    diff.removed.extend(past[i..].iter().map(|v| (*v).clone()));
    diff.added.extend(now[j..].iter().map(|v| (*v).clone()));
    diff
}

fn sorted_refs<'v, T>(codec: &dyn OrderedCodec<T>, values: &'v [T]) -> Vec<&'v T> {
    let mut sorted: Vec<&T> = values.iter().collect();
    sorted.sort_by(|a, b| codec.compare(a, b));
    sorted.dedup_by(|a, b| codec.compare(a, b) == Ordering::Equal);
    sorted
}
