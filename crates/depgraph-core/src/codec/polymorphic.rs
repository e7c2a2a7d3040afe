use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::io::{read_u16, write_u16};
use super::{Codec, DecodeFn, Externalizable};
use crate::error::CoreError;

/// A value whose concrete variant is identified by a wire tag.
pub trait Tagged: Externalizable {
    fn tag(&self) -> u16;
}

/// Explicit tag -> constructor table used to decode polymorphic payloads.
pub struct TagRegistry<T> {
    constructors: BTreeMap<u16, DecodeFn<T>>,
}

impl<T> TagRegistry<T> {
    pub fn new() -> Self {
        TagRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// Registers the constructor for `tag`. Registering a tag twice is a
    /// configuration fault.
    pub fn register(mut self, tag: u16, constructor: DecodeFn<T>) -> Result<Self, CoreError> {
        if self.constructors.insert(tag, constructor).is_some() {
            return Err(CoreError::DuplicateTag { tag });
        }
        Ok(self)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.constructors.contains_key(&tag)
    }
}

impl<T> Default for TagRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `tag` then the payload; reads the tag and dispatches through the
/// registry.
pub struct PolymorphicCodec<T> {
    registry: TagRegistry<T>,
}

impl<T> PolymorphicCodec<T> {
    pub fn new(registry: TagRegistry<T>) -> Self {
        PolymorphicCodec { registry }
    }
}

impl<T: Tagged> Codec<T> for PolymorphicCodec<T> {
    fn encode(&self, out: &mut dyn Write, value: &T) -> Result<(), CoreError> {
        let tag = value.tag();
        if !self.registry.contains(tag) {
            return Err(CoreError::UnknownTag { tag });
        }
        write_u16(out, tag)?;
        value.write_to(out)
    }

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoreError> {
        let tag = read_u16(input)?;
        let constructor = self
            .registry
            .constructors
            .get(&tag)
            .ok_or(CoreError::UnknownTag { tag })?;
        constructor(input)
    }
}
