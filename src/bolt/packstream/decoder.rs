//! PackStream decoder.

use std::collections::HashMap;

use super::marker::*;
use super::value::{Structure, Value};
use super::PackStreamError;

/// Deepest nesting of lists, maps and structures the decoder accepts.
pub const MAX_DEPTH: usize = 256;

/// Reads PackStream values from a borrowed byte slice.
#[derive(Debug)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Unpacker<'a> {
    /// Create an unpacker positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read the next value.
    pub fn unpack(&mut self) -> Result<Value, PackStreamError> {
        let marker = self.take_u8()?;
        match marker {
            0x00..=0x7F | 0xF0..=0xFF => Ok(Value::Integer(i64::from(marker as i8))),
            0x80..=0xBF => {
                let (kind, size) = split_tiny(marker);
                self.unpack_sized(kind, size)
            }
            NULL => Ok(Value::Null),
            TRUE => Ok(Value::Boolean(true)),
            FALSE => Ok(Value::Boolean(false)),
            FLOAT_64 => Ok(Value::Float(f64::from_be_bytes(self.take_array()?))),
            INT_8 => Ok(Value::Integer(i64::from(i8::from_be_bytes(self.take_array()?)))),
            INT_16 => Ok(Value::Integer(i64::from(i16::from_be_bytes(self.take_array()?)))),
            INT_32 => Ok(Value::Integer(i64::from(i32::from_be_bytes(self.take_array()?)))),
            INT_64 => Ok(Value::Integer(i64::from_be_bytes(self.take_array()?))),
            BYTES_8 | STRING_8 | LIST_8 | MAP_8 | STRUCT_8 => {
                let size = usize::from(self.take_u8()?);
                self.unpack_sized(marker, size)
            }
            BYTES_16 | STRING_16 | LIST_16 | MAP_16 | STRUCT_16 => {
                let size = usize::from(u16::from_be_bytes(self.take_array()?));
                self.unpack_sized(marker, size)
            }
            BYTES_32 | STRING_32 | LIST_32 | MAP_32 => {
                let size = u32::from_be_bytes(self.take_array()?) as usize;
                self.unpack_sized(marker, size)
            }
            _ => Err(PackStreamError::UnknownMarker(marker)),
        }
    }

    fn unpack_sized(&mut self, kind: u8, size: usize) -> Result<Value, PackStreamError> {
        match kind {
            BYTES_8 | BYTES_16 | BYTES_32 => Ok(Value::Bytes(self.take(size)?.to_vec())),
            TINY_STRING | STRING_8 | STRING_16 | STRING_32 => {
                Ok(Value::String(self.take_string(size)?))
            }
            _ => {
                if self.depth >= MAX_DEPTH {
                    return Err(PackStreamError::NestingTooDeep(MAX_DEPTH));
                }
                self.depth += 1;
                let value = self.unpack_container(kind, size);
                self.depth -= 1;
                value
            }
        }
    }

    fn unpack_container(&mut self, kind: u8, size: usize) -> Result<Value, PackStreamError> {
        match kind {
            TINY_LIST | LIST_8 | LIST_16 | LIST_32 => {
                let mut items = Vec::with_capacity(size.min(self.remaining()));
                for _ in 0..size {
                    items.push(self.unpack()?);
                }
                Ok(Value::List(items))
            }
            TINY_MAP | MAP_8 | MAP_16 | MAP_32 => {
                let mut map = HashMap::with_capacity(size.min(self.remaining()));
                for _ in 0..size {
                    let key = match self.unpack()? {
                        Value::String(key) => key,
                        _ => return Err(PackStreamError::InvalidMapKey),
                    };
                    let value = self.unpack()?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            TINY_STRUCT | STRUCT_8 | STRUCT_16 => {
                let signature = self.take_u8()?;
                let mut fields = Vec::with_capacity(size.min(self.remaining()));
                for _ in 0..size {
                    fields.push(self.unpack()?);
                }
                Ok(Value::Structure(Structure::new(signature, fields)))
            }
            other => Err(PackStreamError::UnknownMarker(other)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < n {
            return Err(PackStreamError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, PackStreamError> {
        Ok(self.take(1)?[0])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], PackStreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take_string(&mut self, n: usize) -> Result<String, PackStreamError> {
        let bytes = self.take(n)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))
    }
}

/// Decode exactly one value; leftover bytes are an error.
pub fn unpack(data: &[u8]) -> Result<Value, PackStreamError> {
    let mut unpacker = Unpacker::new(data);
    let value = unpacker.unpack()?;
    match unpacker.remaining() {
        0 => Ok(value),
        n => Err(PackStreamError::TrailingBytes(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_tiny_ints() {
        assert_eq!(unpack(&[0x00]).unwrap(), Value::Integer(0));
        assert_eq!(unpack(&[0x7F]).unwrap(), Value::Integer(127));
        assert_eq!(unpack(&[0xF0]).unwrap(), Value::Integer(-16));
        assert_eq!(unpack(&[0xFF]).unwrap(), Value::Integer(-1));
    }

    #[test]
    fn test_unpack_sized_ints() {
        assert_eq!(unpack(&[0xC8, 0x80]).unwrap(), Value::Integer(-128));
        assert_eq!(unpack(&[0xC9, 0x03, 0xE8]).unwrap(), Value::Integer(1000));
        assert_eq!(
            unpack(&[0xCA, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            Value::Integer(-1)
        );
    }

    #[test]
    fn test_unpack_success_structure() {
        // SUCCESS {fields: ["n"]}
        let bytes = [
            0xB1, 0x70, 0xA1, 0x86, b'f', b'i', b'e', b'l', b'd', b's', 0x91, 0x81, b'n',
        ];
        let value = unpack(&bytes).unwrap();
        let s = value.as_structure().unwrap();
        assert_eq!(s.signature, 0x70);
        let meta = s.field(0).and_then(Value::as_map).unwrap();
        assert_eq!(
            meta.get("fields").and_then(Value::to_string_list),
            Some(vec!["n".to_string()])
        );
    }

    #[test]
    fn test_unpack_truncated() {
        assert_eq!(unpack(&[]), Err(PackStreamError::UnexpectedEof));
        assert_eq!(unpack(&[0x83, b'a']), Err(PackStreamError::UnexpectedEof));
        assert_eq!(unpack(&[0xC9, 0x01]), Err(PackStreamError::UnexpectedEof));
        assert_eq!(unpack(&[0x92, 0x01]), Err(PackStreamError::UnexpectedEof));
    }

    #[test]
    fn test_unpack_rejects_bad_input() {
        assert_eq!(unpack(&[0xE5]), Err(PackStreamError::UnknownMarker(0xE5)));
        assert_eq!(unpack(&[0xA1, 0x01, 0x01]), Err(PackStreamError::InvalidMapKey));
        assert!(matches!(
            unpack(&[0x81, 0xFF]),
            Err(PackStreamError::InvalidUtf8(_))
        ));
        assert_eq!(unpack(&[0xC0, 0xC0]), Err(PackStreamError::TrailingBytes(1)));
    }

    #[test]
    fn test_unpack_limits_nesting() {
        let mut deep = vec![0x91; 1_000_000];
        deep.push(0x01);
        assert_eq!(
            unpack(&deep),
            Err(PackStreamError::NestingTooDeep(MAX_DEPTH))
        );

        // struct holding a map holding lists, one level past the limit
        let mut mixed = vec![0xB1, 0x70, 0xA1, 0x81, b'k'];
        mixed.extend(std::iter::repeat(0x91).take(MAX_DEPTH - 1));
        mixed.push(0x01);
        assert_eq!(
            unpack(&mixed),
            Err(PackStreamError::NestingTooDeep(MAX_DEPTH))
        );

        let mut nested = vec![0x91; MAX_DEPTH];
        nested.push(0x01);
        let mut value = unpack(&nested).unwrap();
        for _ in 0..MAX_DEPTH {
            value = match value {
                Value::List(mut items) => items.remove(0),
                other => panic!("expected a list, got {:?}", other),
            };
        }
        assert_eq!(value, Value::Integer(1));
    }

    #[test]
    fn test_unpacker_sequence() {
        let data = [0x01, 0x81, b'x', 0xC3];
        let mut unpacker = Unpacker::new(&data);
        assert_eq!(unpacker.unpack().unwrap(), Value::Integer(1));
        assert_eq!(unpacker.position(), 1);
        assert_eq!(unpacker.unpack().unwrap(), Value::from("x"));
        assert_eq!(unpacker.unpack().unwrap(), Value::Boolean(true));
        assert!(unpacker.is_empty());
    }
}
