//! The serialization codec layer.
//!
//! A [`Codec`] reads and writes one typed value against a byte stream and
//! can allocate a pre-sized container for collections read back from
//! storage. An [`OrderedCodec`] adds a total order so persisted value sets
//! can be kept and compared in sorted form.
//!
//! Three binding modes are provided:
//! - [`ExternalizableCodec`]: the value encodes itself
//!   ([`Externalizable::write_to`]) and is decoded by an external function.
//! - [`PolymorphicCodec`]: a tag precedes the payload and decoding dispatches
//!   through an explicit [`TagRegistry`], for heterogeneous record sets.
//! - [`JsonCodec`]: a length-prefixed `serde_json` payload.

pub mod io;
mod json;
mod polymorphic;

use std::cmp::Ordering;
use std::io::{Read, Write};

pub use json::JsonCodec;
pub use polymorphic::{PolymorphicCodec, TagRegistry, Tagged};

use crate::error::CoreError;

/// Reads and writes values of type `T`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, out: &mut dyn Write, value: &T) -> Result<(), CoreError>;

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoreError>;

    /// Returns an empty container able to hold `len` decoded values.
    fn new_container(&self, len: usize) -> Vec<T> {
        Vec::with_capacity(len)
    }
}

/// A [`Codec`] with a total order over the values it encodes.
pub trait OrderedCodec<T>: Codec<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// A value that knows how to write itself to a stream.
pub trait Externalizable {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), CoreError>;
}

/// External decode function paired with an [`Externalizable`] type.
pub type DecodeFn<T> = fn(&mut dyn Read) -> Result<T, CoreError>;

/// Binds a type's own `write_to` with an external decode function.
pub struct ExternalizableCodec<T> {
    decode: DecodeFn<T>,
}

impl<T> ExternalizableCodec<T> {
    pub fn new(decode: DecodeFn<T>) -> Self {
        ExternalizableCodec { decode }
    }
}

impl<T> Clone for ExternalizableCodec<T> {
    fn clone(&self) -> Self {
        ExternalizableCodec {
            decode: self.decode,
        }
    }
}

impl<T: Externalizable> Codec<T> for ExternalizableCodec<T> {
    fn encode(&self, out: &mut dyn Write, value: &T) -> Result<(), CoreError> {
        value.write_to(out)
    }

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoreError> {
        (self.decode)(input)
    }
}

impl<T: Externalizable + Ord> OrderedCodec<T> for ExternalizableCodec<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Encodes a single value into a fresh buffer.
pub fn encode_to_vec<T>(codec: &dyn Codec<T>, value: &T) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    codec.encode(&mut buf, value)?;
    Ok(buf)
}

/// Decodes a single value, rejecting trailing bytes.
pub fn decode_from_slice<T>(codec: &dyn Codec<T>, bytes: &[u8]) -> Result<T, CoreError> {
    let mut input = bytes;
    let value = codec.decode(&mut input)?;
    if !input.is_empty() {
        return Err(CoreError::Malformed {
            reason: format!("{} trailing bytes after value", input.len()),
        });
    }
    Ok(value)
}

/// Writes a count-prefixed collection.
pub fn encode_collection<T>(
    codec: &dyn Codec<T>,
    out: &mut dyn Write,
    values: &[T],
) -> Result<(), CoreError> {
    io::write_varint(out, values.len() as u64)?;
    for value in values {
        codec.encode(out, value)?;
    }
    Ok(())
}

/// Reads a count-prefixed collection into a container sized by the codec.
pub fn decode_collection<T>(
    codec: &dyn Codec<T>,
    input: &mut dyn Read,
) -> Result<Vec<T>, CoreError> {
    let len = io::read_len(input)?;
    let mut values = codec.new_container(len);
    for _ in 0..len {
        values.push(codec.decode(input)?);
    }
    Ok(values)
}
