//! Bolt wire-level error types.

use std::io;

use thiserror::Error;

use super::packstream::PackStreamError;

/// Result type for wire-level operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Errors raised while framing, encoding or negotiating.
#[derive(Debug, Error)]
pub enum BoltError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Handshake failed
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Message body could not be encoded or decoded
    #[error("PackStream error: {0}")]
    PackStream(#[from] PackStreamError),

    /// Message shape violates the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Defragmented message exceeds the receive limit
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Size reached so far
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Server agreed on a version this client does not speak
    #[error("Unsupported protocol version: 0x{0:08X}")]
    UnsupportedVersion(u32),
}

/// Handshake-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Preamble did not start with the Bolt magic
    #[error("Invalid magic number: expected {expected:02X?}, received {received:02X?}")]
    InvalidMagic {
        /// Bolt magic
        expected: [u8; 4],
        /// Bytes actually received
        received: [u8; 4],
    },

    /// Server answered with version 0
    #[error("No compatible protocol version")]
    NoCompatibleVersion,

    /// Malformed handshake bytes
    #[error("Invalid handshake data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: BoltError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, BoltError::Io(_)));

        let err: BoltError = PackStreamError::UnexpectedEof.into();
        assert!(err.to_string().starts_with("PackStream error"));

        let err: BoltError = HandshakeError::NoCompatibleVersion.into();
        assert_eq!(err.to_string(), "Handshake error: No compatible protocol version");
    }

    #[test]
    fn test_version_display() {
        assert_eq!(
            BoltError::UnsupportedVersion(0x0104).to_string(),
            "Unsupported protocol version: 0x00000104"
        );
        assert_eq!(
            BoltError::MessageTooLarge { size: 10, max: 5 }.to_string(),
            "Message too large: 10 bytes (max: 5)"
        );
    }
}
