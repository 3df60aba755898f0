//! PackStream marker bytes.
//!
//! The high nibble of a tiny marker selects the type and the low nibble
//! carries the size (0-15). Larger values use a dedicated marker followed
//! by an 8, 16 or 32-bit big-endian size.

#![deny(missing_docs)]

/// Null marker
pub const NULL: u8 = 0xC0;
/// 64-bit float marker
pub const FLOAT_64: u8 = 0xC1;
/// Boolean false
pub const FALSE: u8 = 0xC2;
/// Boolean true
pub const TRUE: u8 = 0xC3;

/// 8-bit signed integer; -16..=127 are written inline as a single byte
pub const INT_8: u8 = 0xC8;
/// 16-bit signed integer
pub const INT_16: u8 = 0xC9;
/// 32-bit signed integer
pub const INT_32: u8 = 0xCA;
/// 64-bit signed integer
pub const INT_64: u8 = 0xCB;

/// Smallest integer written inline
pub const TINY_INT_MIN: i64 = -16;
/// Largest integer written inline
pub const TINY_INT_MAX: i64 = 127;

/// Byte array, 8-bit length
pub const BYTES_8: u8 = 0xCC;
/// Byte array, 16-bit length
pub const BYTES_16: u8 = 0xCD;
/// Byte array, 32-bit length
pub const BYTES_32: u8 = 0xCE;

/// String, length in the low nibble
pub const TINY_STRING: u8 = 0x80;
/// String, 8-bit length
pub const STRING_8: u8 = 0xD0;
/// String, 16-bit length
pub const STRING_16: u8 = 0xD1;
/// String, 32-bit length
pub const STRING_32: u8 = 0xD2;

/// List, size in the low nibble
pub const TINY_LIST: u8 = 0x90;
/// List, 8-bit size
pub const LIST_8: u8 = 0xD4;
/// List, 16-bit size
pub const LIST_16: u8 = 0xD5;
/// List, 32-bit size
pub const LIST_32: u8 = 0xD6;

/// Map, entry count in the low nibble
pub const TINY_MAP: u8 = 0xA0;
/// Map, 8-bit entry count
pub const MAP_8: u8 = 0xD8;
/// Map, 16-bit entry count
pub const MAP_16: u8 = 0xD9;
/// Map, 32-bit entry count
pub const MAP_32: u8 = 0xDA;

/// Structure, field count in the low nibble
pub const TINY_STRUCT: u8 = 0xB0;
/// Structure, 8-bit field count
pub const STRUCT_8: u8 = 0xDC;
/// Structure, 16-bit field count
pub const STRUCT_16: u8 = 0xDD;

/// Largest size that fits in a tiny marker's low nibble
pub const TINY_SIZE_MAX: usize = 15;

/// Size header family for a sized type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedMarkers {
    /// Tiny marker base (size in the low nibble), if the type has one
    pub tiny: Option<u8>,
    /// 8-bit size marker
    pub m8: u8,
    /// 16-bit size marker
    pub m16: u8,
    /// 32-bit size marker, if the type allows one
    pub m32: Option<u8>,
}

/// Byte array size markers
pub const BYTES_MARKERS: SizedMarkers = SizedMarkers {
    tiny: None,
    m8: BYTES_8,
    m16: BYTES_16,
    m32: Some(BYTES_32),
};

/// String size markers
pub const STRING_MARKERS: SizedMarkers = SizedMarkers {
    tiny: Some(TINY_STRING),
    m8: STRING_8,
    m16: STRING_16,
    m32: Some(STRING_32),
};

/// List size markers
pub const LIST_MARKERS: SizedMarkers = SizedMarkers {
    tiny: Some(TINY_LIST),
    m8: LIST_8,
    m16: LIST_16,
    m32: Some(LIST_32),
};

/// Map size markers
pub const MAP_MARKERS: SizedMarkers = SizedMarkers {
    tiny: Some(TINY_MAP),
    m8: MAP_8,
    m16: MAP_16,
    m32: Some(MAP_32),
};

/// Structure size markers
pub const STRUCT_MARKERS: SizedMarkers = SizedMarkers {
    tiny: Some(TINY_STRUCT),
    m8: STRUCT_8,
    m16: STRUCT_16,
    m32: None,
};

/// True if `value` is written as a single inline byte.
#[inline]
pub fn is_tiny_int(value: i64) -> bool {
    (TINY_INT_MIN..=TINY_INT_MAX).contains(&value)
}

/// Split a tiny marker into its type nibble and size nibble.
#[inline]
pub fn split_tiny(marker: u8) -> (u8, usize) {
    (marker & 0xF0, (marker & 0x0F) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_int_range() {
        assert!(is_tiny_int(-16));
        assert!(is_tiny_int(127));
        assert!(!is_tiny_int(-17));
        assert!(!is_tiny_int(128));
    }

    #[test]
    fn test_split_tiny() {
        assert_eq!(split_tiny(0x85), (TINY_STRING, 5));
        assert_eq!(split_tiny(0x9F), (TINY_LIST, 15));
        assert_eq!(split_tiny(0xA0), (TINY_MAP, 0));
        assert_eq!(split_tiny(0xB3), (TINY_STRUCT, 3));
    }

    #[test]
    fn test_struct_has_no_32_bit_size() {
        assert!(STRUCT_MARKERS.m32.is_none());
        assert!(BYTES_MARKERS.tiny.is_none());
    }
}
