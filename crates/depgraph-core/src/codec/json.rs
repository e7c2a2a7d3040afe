use std::io::{Read, Write};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::io::{read_bytes, write_bytes};
use super::Codec;
use crate::error::CoreError;

/// Length-prefixed `serde_json` framing for serde-enabled records.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        JsonCodec {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec<T> {
    fn encode(&self, out: &mut dyn Write, value: &T) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(value)?;
        write_bytes(out, &bytes)
    }

    fn decode(&self, input: &mut dyn Read) -> Result<T, CoreError> {
        let bytes = read_bytes(input)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
