//! Usage edges: recorded dependencies from a symbol record to a symbol id.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec::io::{read_bool, read_str, write_bool, write_str};
use crate::codec::Externalizable;
use crate::error::CoreError;
use crate::id::SymbolId;

/// A directed dependency on `target`.
///
/// `detail` optionally discriminates between different uses of the same
/// target (a member access, a constructor call, ...). Two usages are equal
/// only when both the target and the detail match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Usage {
    pub target: SymbolId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Usage {
    /// A bare usage of `target`.
    pub fn of(target: impl Into<SymbolId>) -> Self {
        Usage {
            target: target.into(),
            detail: None,
        }
    }

    /// A usage of `target` qualified by `detail`.
    pub fn with_detail(target: impl Into<SymbolId>, detail: impl Into<String>) -> Self {
        Usage {
            target: target.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn target(&self) -> &SymbolId {
        &self.target
    }

    /// True when an effect on `self` reaches `other`: same target, and
    /// either `self` has no detail or both details match.
    pub fn covers(&self, other: &Usage) -> bool {
        self.target == other.target && (self.detail.is_none() || self.detail == other.detail)
    }

    pub fn read_from(input: &mut dyn Read) -> Result<Self, CoreError> {
        let target = SymbolId::read_from(input)?;
        let detail = if read_bool(input)? {
            Some(read_str(input)?)
        } else {
            None
        };
        Ok(Usage { target, detail })
    }
}

impl Externalizable for Usage {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), CoreError> {
        self.target.write_to(out)?;
        match &self.detail {
            Some(detail) => {
                write_bool(out, true)?;
                write_str(out, detail)
            }
            None => write_bool(out, false),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}#{}", self.target, detail),
            None => write!(f, "{}", self.target),
        }
    }
}
