//! PackStream encoder.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::value::{Structure, Value};
use super::PackStreamError;

/// Writes PackStream values into a growable buffer.
#[derive(Debug)]
pub struct Packer {
    buffer: BytesMut,
}

impl Packer {
    /// Create a packer with a small default buffer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a packer with the given buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the packer, returning the written bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write any value.
    pub fn pack(&mut self, value: &Value) -> Result<(), PackStreamError> {
        match value {
            Value::Null => self.buffer.put_u8(NULL),
            Value::Boolean(b) => self.buffer.put_u8(if *b { TRUE } else { FALSE }),
            Value::Integer(i) => self.pack_int(*i),
            Value::Float(f) => {
                self.buffer.put_u8(FLOAT_64);
                self.buffer.put_f64(*f);
            }
            Value::Bytes(b) => {
                self.pack_header(&BYTES_MARKERS, b.len(), "bytes")?;
                self.buffer.put_slice(b);
            }
            Value::String(s) => self.pack_string(s)?,
            Value::List(items) => self.pack_list(items)?,
            Value::Map(map) => self.pack_map(map)?,
            Value::Structure(s) => self.pack_structure(s)?,
        }
        Ok(())
    }

    /// Write an integer in its smallest representation.
    pub fn pack_int(&mut self, value: i64) {
        if is_tiny_int(value) {
            self.buffer.put_i8(value as i8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(v);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Write a UTF-8 string.
    pub fn pack_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        self.pack_header(&STRING_MARKERS, value.len(), "string")?;
        self.buffer.put_slice(value.as_bytes());
        Ok(())
    }

    /// Write a list and its items.
    pub fn pack_list(&mut self, items: &[Value]) -> Result<(), PackStreamError> {
        self.pack_header(&LIST_MARKERS, items.len(), "list")?;
        items.iter().try_for_each(|item| self.pack(item))
    }

    /// Write a map; entries go out in the map's iteration order.
    pub fn pack_map(&mut self, map: &HashMap<String, Value>) -> Result<(), PackStreamError> {
        self.pack_header(&MAP_MARKERS, map.len(), "map")?;
        for (key, value) in map {
            self.pack_string(key)?;
            self.pack(value)?;
        }
        Ok(())
    }

    /// Write a structure header, its signature and its fields.
    pub fn pack_structure(&mut self, s: &Structure) -> Result<(), PackStreamError> {
        self.pack_header(&STRUCT_MARKERS, s.fields.len(), "structure")?;
        self.buffer.put_u8(s.signature);
        s.fields.iter().try_for_each(|field| self.pack(field))
    }

    fn pack_header(
        &mut self,
        markers: &SizedMarkers,
        size: usize,
        what: &'static str,
    ) -> Result<(), PackStreamError> {
        match (markers.tiny, size) {
            (Some(base), n) if n <= TINY_SIZE_MAX => self.buffer.put_u8(base | n as u8),
            (_, n) if n <= u8::MAX as usize => {
                self.buffer.put_u8(markers.m8);
                self.buffer.put_u8(n as u8);
            }
            (_, n) if n <= u16::MAX as usize => {
                self.buffer.put_u8(markers.m16);
                self.buffer.put_u16(n as u16);
            }
            (_, n) => match markers.m32 {
                Some(m32) if n <= u32::MAX as usize => {
                    self.buffer.put_u8(m32);
                    self.buffer.put_u32(n as u32);
                }
                _ => return Err(PackStreamError::ValueTooLarge(what, n)),
            },
        }
        Ok(())
    }
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single value.
pub fn pack(value: &Value) -> Result<BytesMut, PackStreamError> {
    let mut packer = Packer::new();
    packer.pack(value)?;
    Ok(packer.into_bytes())
}
