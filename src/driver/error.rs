//! Driver error types.

use std::io;

use thiserror::Error;

use crate::bolt::{BoltError, FailureMessage};

// ============================================================================
// DriverError
// ============================================================================

/// Errors surfaced by sessions, transports and pipelines.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Stream could not be opened, or encryption negotiation failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Read or write attempted without an open stream
    #[error("Not connected")]
    NotConnected,

    /// Read or write failed mid-stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the stream
    #[error("Broken pipe: {0}")]
    BrokenPipe(String),

    /// Idle threshold or read timeout exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A response signature broke the expected request/response order
    #[error("Protocol desync: expected {expected}, received {received}")]
    ProtocolDesync {
        /// Signature the state machine was waiting for
        expected: String,
        /// Signature actually received
        received: String,
    },

    /// Server reported a failure; the connection has been recovered
    #[error("Server failure: {code} - {message}")]
    MessageFailure {
        /// Status code
        code: String,
        /// Human-readable message
        message: String,
    },

    /// INIT was not acknowledged with SUCCESS
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The session already has a live transaction
    #[error("A transaction is already bound to this session")]
    TransactionAlreadyBound,

    /// Operation not available at the negotiated protocol version
    #[error("{operation} is not supported by protocol version {version}")]
    UnsupportedOperation {
        /// Rejected operation
        operation: &'static str,
        /// Negotiated version
        version: u32,
    },

    /// Framing or codec violation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation not allowed in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid URI or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DriverError {
    /// Connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Broken pipe error.
    pub fn broken_pipe(msg: impl Into<String>) -> Self {
        Self::BrokenPipe(msg.into())
    }

    /// Timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Desync between the expected and the received signature.
    pub fn desync(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self::ProtocolDesync {
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// Server failure.
    pub fn message_failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MessageFailure {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The connection can no longer be used and must be rebuilt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::NotConnected
                | Self::Io(_)
                | Self::BrokenPipe(_)
                | Self::Timeout(_)
                | Self::ProtocolDesync { .. }
                | Self::Initialization(_)
                | Self::Protocol(_)
        )
    }

    /// The session stays usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Server status code, for `MessageFailure`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::MessageFailure { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Io(e) => DriverError::Io(e),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}

impl From<FailureMessage> for DriverError {
    fn from(failure: FailureMessage) -> Self {
        DriverError::MessageFailure {
            code: failure.code,
            message: failure.message,
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Driver result type.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{HandshakeError, PackStreamError};

    #[test]
    fn test_display() {
        let err = DriverError::message_failure("Neo.ClientError.Statement.SyntaxError", "bad");
        assert_eq!(
            err.to_string(),
            "Server failure: Neo.ClientError.Statement.SyntaxError - bad"
        );

        let err = DriverError::desync("IGNORED", "RECORD");
        assert_eq!(err.to_string(), "Protocol desync: expected IGNORED, received RECORD");

        let err = DriverError::UnsupportedOperation {
            operation: "BEGIN",
            version: 1,
        };
        assert_eq!(err.to_string(), "BEGIN is not supported by protocol version 1");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DriverError::desync("SUCCESS", "IGNORED").is_fatal());
        assert!(DriverError::timeout("idle").is_fatal());
        assert!(DriverError::NotConnected.is_fatal());
        assert!(DriverError::Initialization("denied".into()).is_fatal());

        let failure = DriverError::message_failure("Neo.ClientError.Statement.SyntaxError", "x");
        assert!(failure.is_recoverable());
        assert_eq!(failure.code(), Some("Neo.ClientError.Statement.SyntaxError"));
        assert!(DriverError::TransactionAlreadyBound.is_recoverable());
        assert_eq!(DriverError::TransactionAlreadyBound.code(), None);
    }

    #[test]
    fn test_from_bolt_error() {
        let err: DriverError = BoltError::Io(io::Error::new(io::ErrorKind::Other, "x")).into();
        assert!(matches!(err, DriverError::Io(_)));

        let err: DriverError = BoltError::PackStream(PackStreamError::UnexpectedEof).into();
        assert!(matches!(err, DriverError::Protocol(_)));

        let err: DriverError = BoltError::Handshake(HandshakeError::NoCompatibleVersion).into();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[test]
    fn test_from_failure_message() {
        let err: DriverError = FailureMessage::new("Neo.TransientError.General.X", "busy").into();
        assert!(matches!(err, DriverError::MessageFailure { ref code, .. } if code.ends_with(".X")));
    }
}
