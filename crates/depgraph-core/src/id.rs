//! Stable identifier newtypes for graph entities.
//!
//! [`SymbolId`] names one program entity independent of the origin that
//! produced it; [`OriginId`] names the source unit (usually a file) a record
//! came from. Both compare and hash by value and are stable across builds.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec::io::{read_str, write_str};
use crate::codec::{Externalizable, ExternalizableCodec};
use crate::error::CoreError;

/// Stable symbol identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

/// Identifier of the source unit that produced one or more symbol records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginId(String);

impl SymbolId {
    pub fn new(name: impl Into<String>) -> Self {
        SymbolId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id written by [`Externalizable::write_to`].
    pub fn read_from(input: &mut dyn Read) -> Result<Self, CoreError> {
        Ok(SymbolId(read_str(input)?))
    }

    /// Ordered codec for keys and value sets of persistent maps.
    pub fn codec() -> ExternalizableCodec<SymbolId> {
        ExternalizableCodec::new(SymbolId::read_from)
    }
}

impl OriginId {
    pub fn new(path: impl Into<String>) -> Self {
        OriginId(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id written by [`Externalizable::write_to`].
    pub fn read_from(input: &mut dyn Read) -> Result<Self, CoreError> {
        Ok(OriginId(read_str(input)?))
    }

    /// Ordered codec for keys and value sets of persistent maps.
    pub fn codec() -> ExternalizableCodec<OriginId> {
        ExternalizableCodec::new(OriginId::read_from)
    }
}

impl Externalizable for SymbolId {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), CoreError> {
        write_str(out, &self.0)
    }
}

impl Externalizable for OriginId {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), CoreError> {
        write_str(out, &self.0)
    }
}

impl From<&str> for SymbolId {
    fn from(s: &str) -> Self {
        SymbolId(s.to_string())
    }
}

impl From<String> for SymbolId {
    fn from(s: String) -> Self {
        SymbolId(s)
    }
}

impl From<&str> for OriginId {
    fn from(s: &str) -> Self {
        OriginId(s.to_string())
    }
}

impl From<String> for OriginId {
    fn from(s: String) -> Self {
        OriginId(s)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
