//! # Bolt V1 wire layer
//!
//! Everything that touches bytes: the PackStream format, message types,
//! chunk framing and the version handshake.
//!
//! ## Submodules
//!
//! - [`packstream`] - Binary serialization of values and structures
//! - [`message`] - INIT, RUN, PULL_ALL, ACK_FAILURE and their responses
//! - [`codec`] - Chunk framing for tokio_util
//! - [`handshake`] - Magic preamble and version negotiation
//! - [`error`] - Wire-level error types
//!
//! Most users should go through [`crate::driver::Session`] instead.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::ChunkCodec;
pub use error::{BoltError, BoltResult, HandshakeError};
pub use handshake::{BOLT_MAGIC, PROTOCOL_VERSION};
pub use message::{
    BoltRequest, BoltResponse, FailureMessage, InitMessage, RawMessage, RecordMessage,
    RunMessage, Signature, SuccessMessage,
};
pub use packstream::{PackStreamError, Structure, Value};
