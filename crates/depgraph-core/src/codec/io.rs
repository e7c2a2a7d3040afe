//! Primitive framing helpers shared by every codec.
//!
//! Fixed-width integers are little-endian; lengths and counts are unsigned
//! LEB128 varints; strings are a varint byte length followed by UTF-8.

use std::io::{Read, Write};

use crate::error::CoreError;

/// Upper bound on a single length-prefixed payload (64 MiB).
const MAX_PAYLOAD_LEN: u64 = 64 * 1024 * 1024;

pub fn write_u8(out: &mut dyn Write, value: u8) -> Result<(), CoreError> {
    out.write_all(&[value])?;
    Ok(())
}

pub fn read_u8(input: &mut dyn Read) -> Result<u8, CoreError> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn write_u16(out: &mut dyn Write, value: u16) -> Result<(), CoreError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn read_u16(input: &mut dyn Read) -> Result<u16, CoreError> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn write_bool(out: &mut dyn Write, value: bool) -> Result<(), CoreError> {
    write_u8(out, value as u8)
}

pub fn read_bool(input: &mut dyn Read) -> Result<bool, CoreError> {
    match read_u8(input)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CoreError::Malformed {
            reason: format!("invalid bool byte {other}"),
        }),
    }
}

/// Writes `value` as an unsigned LEB128 varint.
pub fn write_varint(out: &mut dyn Write, mut value: u64) -> Result<(), CoreError> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            return write_u8(out, byte);
        }
        write_u8(out, byte | 0x80)?;
    }
}

pub fn read_varint(input: &mut dyn Read) -> Result<u64, CoreError> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = read_u8(input)?;
        if shift >= 64 {
            return Err(CoreError::Malformed {
                reason: "varint overflows 64 bits".to_string(),
            });
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Reads a varint length and checks it against [`MAX_PAYLOAD_LEN`].
pub fn read_len(input: &mut dyn Read) -> Result<usize, CoreError> {
    let len = read_varint(input)?;
    if len > MAX_PAYLOAD_LEN {
        return Err(CoreError::Malformed {
            reason: format!("length {len} exceeds payload limit"),
        });
    }
    Ok(len as usize)
}

pub fn write_bytes(out: &mut dyn Write, bytes: &[u8]) -> Result<(), CoreError> {
    write_varint(out, bytes.len() as u64)?;
    out.write_all(bytes)?;
    Ok(())
}

pub fn read_bytes(input: &mut dyn Read) -> Result<Vec<u8>, CoreError> {
    let len = read_len(input)?;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_str(out: &mut dyn Write, value: &str) -> Result<(), CoreError> {
    write_bytes(out, value.as_bytes())
}

pub fn read_str(input: &mut dyn Read) -> Result<String, CoreError> {
    String::from_utf8(read_bytes(input)?).map_err(|e| CoreError::Malformed {
        reason: format!("invalid UTF-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_small_values_take_one_byte() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 127).unwrap();
        assert_eq!(buf, vec![0x7f]);
    }

    #[test]
    fn varint_multi_byte() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300).unwrap();
        assert_eq!(buf, vec![0xac, 0x02]);
        assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), 300);
    }

    #[test]
    fn varint_max_value() {
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX).unwrap();
        assert_eq!(buf.len(), 10);
        assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), u64::MAX);
    }

    #[test]
    fn truncated_string_is_an_io_error() {
        let buf = vec![5u8, b'a', b'b'];
        let err = read_str(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let buf = vec![1u8, 0xff];
        let err = read_str(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, CoreError::Malformed { .. }));
    }

    #[test]
    fn invalid_bool_is_malformed() {
        let buf = vec![2u8];
        assert!(matches!(
            read_bool(&mut buf.as_slice()),
            Err(CoreError::Malformed { .. })
        ));
    }
}
