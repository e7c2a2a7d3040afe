//! A general-purpose symbol record.
//!
//! [`Symbol`] carries just enough shape for language-agnostic invalidation:
//! a kind, an opaque signature string (whatever the front-end considers the
//! externally visible shape), a generated-code flag, and usage edges.
//! Front-ends with richer models implement [`Node`] on their own types.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::diff::{set_diff, Difference, SetDiff};
use crate::id::SymbolId;
use crate::node::Node;
use crate::usage::Usage;

/// An immutable snapshot of one symbol's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: String,
    pub signature: String,
    /// Produced by a code generator rather than written by hand.
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub usages: SmallVec<[Usage; 4]>,
}

impl Symbol {
    pub fn new(
        id: impl Into<SymbolId>,
        kind: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Symbol {
            id: id.into(),
            kind: kind.into(),
            signature: signature.into(),
            generated: false,
            usages: SmallVec::new(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        if !self.usages.contains(&usage) {
            self.usages.push(usage);
        }
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
}

/// Field-level difference between two versions of a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDiff {
    pub kind_changed: bool,
    pub signature_changed: bool,
    pub generated_changed: bool,
    pub usages: SetDiff<Usage>,
}

impl Difference for SymbolDiff {
    fn unchanged(&self) -> bool {
        !self.kind_changed
            && !self.signature_changed
            && !self.generated_changed
            && self.usages.unchanged()
    }
}

impl Node for Symbol {
    type Diff = SymbolDiff;

    fn id(&self) -> &SymbolId {
        &self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn usages(&self) -> &[Usage] {
        &self.usages
    }

    fn difference(&self, past: &Self) -> SymbolDiff {
        SymbolDiff {
            kind_changed: self.kind != past.kind,
            signature_changed: self.signature != past.signature,
            generated_changed: self.generated != past.generated,
            usages: set_diff(&past.usages, &self.usages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_usage_deduplicates() {
        let s = Symbol::new("B", "class", "class B")
            .with_usage(Usage::of("A"))
            .with_usage(Usage::of("A"));
        assert_eq!(s.usages().len(), 1);
        assert!(s.uses(&SymbolId::from("A")));
        assert!(!s.uses(&SymbolId::from("C")));
    }

    #[test]
    fn usage_only_change_is_reported() {
        let past = Symbol::new("B", "class", "class B").with_usage(Usage::of("A"));
        let now = Symbol::new("B", "class", "class B").with_usage(Usage::of("C"));
        let diff = now.difference(&past);
        assert!(!diff.unchanged());
        assert!(!diff.signature_changed);
        assert_eq!(diff.usages.added, vec![Usage::of("C")]);
        assert_eq!(diff.usages.removed, vec![Usage::of("A")]);
    }

    #[test]
    fn identical_symbols_are_unchanged() {
        let a = Symbol::new("A", "fn", "fn a(i32) -> i32").generated();
        assert!(a.difference(&a.clone()).unchanged());
    }

    #[test]
    fn json_defaults_optional_fields() {
        let s: Symbol =
            serde_json::from_str(r#"{"id":"A","kind":"class","signature":"class A"}"#).unwrap();
        assert!(!s.generated);
        assert!(s.usages.is_empty());
    }
}
