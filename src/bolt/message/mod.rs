//! Bolt V1 messages.
//!
//! Every message is a PackStream structure whose signature byte names the
//! message. Requests flow client to server, responses server to client.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use std::fmt;

/// Bolt V1 signature bytes.
pub mod tag {
    /// INIT request (0x01)
    pub const INIT: u8 = 0x01;
    /// ACK_FAILURE request (0x0E)
    pub const ACK_FAILURE: u8 = 0x0E;
    /// RUN request (0x10)
    pub const RUN: u8 = 0x10;
    /// PULL_ALL request (0x3F)
    pub const PULL_ALL: u8 = 0x3F;

    /// SUCCESS response (0x70)
    pub const SUCCESS: u8 = 0x70;
    /// RECORD response (0x71)
    pub const RECORD: u8 = 0x71;
    /// IGNORED response (0x7E)
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE response (0x7F)
    pub const FAILURE: u8 = 0x7F;
}

/// Symbolic name for each signature byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// INIT
    Init,
    /// ACK_FAILURE
    AckFailure,
    /// RUN
    Run,
    /// PULL_ALL
    PullAll,
    /// SUCCESS
    Success,
    /// RECORD
    Record,
    /// IGNORED
    Ignored,
    /// FAILURE
    Failure,
}

impl Signature {
    /// Look up a signature byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            tag::INIT => Signature::Init,
            tag::ACK_FAILURE => Signature::AckFailure,
            tag::RUN => Signature::Run,
            tag::PULL_ALL => Signature::PullAll,
            tag::SUCCESS => Signature::Success,
            tag::RECORD => Signature::Record,
            tag::IGNORED => Signature::Ignored,
            tag::FAILURE => Signature::Failure,
            _ => return None,
        })
    }

    /// Signature byte on the wire.
    pub fn byte(self) -> u8 {
        match self {
            Signature::Init => tag::INIT,
            Signature::AckFailure => tag::ACK_FAILURE,
            Signature::Run => tag::RUN,
            Signature::PullAll => tag::PULL_ALL,
            Signature::Success => tag::SUCCESS,
            Signature::Record => tag::RECORD,
            Signature::Ignored => tag::IGNORED,
            Signature::Failure => tag::FAILURE,
        }
    }

    /// Protocol name, e.g. `PULL_ALL`.
    pub fn name(self) -> &'static str {
        match self {
            Signature::Init => "INIT",
            Signature::AckFailure => "ACK_FAILURE",
            Signature::Run => "RUN",
            Signature::PullAll => "PULL_ALL",
            Signature::Success => "SUCCESS",
            Signature::Record => "RECORD",
            Signature::Ignored => "IGNORED",
            Signature::Failure => "FAILURE",
        }
    }

    /// True for the four response signatures.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Signature::Success | Signature::Record | Signature::Ignored | Signature::Failure
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
