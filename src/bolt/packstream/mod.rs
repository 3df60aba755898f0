//! PackStream serialization format.
//!
//! PackStream is the binary format every Bolt message body is written in.
//! A value is a marker byte, optionally followed by a size and a payload.
//!
//! # Supported Types
//!
//! - **Null**, **Boolean**: single marker byte
//! - **Integer**: tiny (one byte) through 64-bit, smallest form on encode
//! - **Float**: 64-bit IEEE 754
//! - **String**, **Bytes**: length-prefixed
//! - **List**, **Map**: size-prefixed containers (map keys are strings)
//! - **Structure**: a signature byte plus positional fields
//!
//! Bolt messages are themselves structures; so are the graph values
//! (Node, Relationship, Path) that appear inside RECORD rows.

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod structures;
pub mod value;

pub use decoder::{unpack, Unpacker};
pub use encoder::{pack, Packer};
pub use structures::{Node, Path, Relationship, UnboundRelationship};
pub use value::{Structure, Value};

use thiserror::Error;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackStreamError {
    /// Input ended in the middle of a value
    #[error("Unexpected end of PackStream data")]
    UnexpectedEof,

    /// Marker byte does not belong to any PackStream type
    #[error("Unknown PackStream marker: 0x{0:02X}")]
    UnknownMarker(u8),

    /// String payload is not UTF-8
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(String),

    /// Map key that is not a string
    #[error("Map keys must be strings")]
    InvalidMapKey,

    /// Value does not fit the widest size header of its type
    #[error("{0} too large: {1} entries")]
    ValueTooLarge(&'static str, usize),

    /// Structure does not have the shape its signature requires
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Bytes left over after a complete value
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// Lists, maps and structures nested beyond the decoder limit
    #[error("Values nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
