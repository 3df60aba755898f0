//! Failure recovery.
//!
//! After a FAILURE the server skips every request already queued behind it,
//! answering each with IGNORED, and then refuses further work until the
//! client sends ACK_FAILURE. Recovery therefore runs in three phases:
//!
//! 1. discard exactly one IGNORED per outstanding request,
//! 2. send ACK_FAILURE,
//! 3. expect SUCCESS for it.
//!
//! [`Recovery`] holds the phase; the session owns the I/O and feeds it
//! responses. Any other response at any phase means the stream is no longer
//! aligned with the requests it carries.

use super::error::DriverError;
use crate::bolt::{BoltResponse, FailureMessage, Signature};

/// Recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Discarding IGNORED responses for requests sent after the failure
    Draining {
        /// IGNORED responses still expected
        remaining: usize,
    },
    /// ACK_FAILURE must be sent next
    Acknowledging,
    /// ACK_FAILURE sent; its SUCCESS is pending
    AwaitingAck,
    /// Server-side failure state cleared
    Recovered,
}

impl Recovery {
    /// Start recovery with `outstanding` requests still unanswered.
    pub fn start(outstanding: usize) -> Self {
        if outstanding == 0 {
            Recovery::Acknowledging
        } else {
            Recovery::Draining {
                remaining: outstanding,
            }
        }
    }

    /// True when the next step is reading a response.
    pub fn awaits_response(&self) -> bool {
        matches!(self, Recovery::Draining { .. } | Recovery::AwaitingAck)
    }

    /// Advance on a received response.
    pub fn on_response(self, response: &BoltResponse) -> Result<Self, DriverError> {
        match (self, response) {
            (Recovery::Draining { remaining }, BoltResponse::Ignored) if remaining > 1 => {
                Ok(Recovery::Draining {
                    remaining: remaining - 1,
                })
            }
            (Recovery::Draining { .. }, BoltResponse::Ignored) => Ok(Recovery::Acknowledging),
            (Recovery::Draining { .. }, other) => {
                Err(DriverError::desync(Signature::Ignored.name(), other.name()))
            }
            (Recovery::AwaitingAck, BoltResponse::Success(_)) => Ok(Recovery::Recovered),
            (Recovery::AwaitingAck, other) => {
                Err(DriverError::desync(Signature::Success.name(), other.name()))
            }
            (Recovery::Acknowledging | Recovery::Recovered, other) => {
                Err(DriverError::desync("no response", other.name()))
            }
        }
    }

    /// Advance once ACK_FAILURE has been written.
    pub fn ack_sent(self) -> Result<Self, DriverError> {
        match self {
            Recovery::Acknowledging => Ok(Recovery::AwaitingAck),
            other => Err(DriverError::invalid_state(format!(
                "ACK_FAILURE sent while {:?}",
                other
            ))),
        }
    }
}

/// How a recovery attempt ended.
#[derive(Debug)]
pub enum RecoveryOutcome {
    /// The server acknowledged; the session is usable and the failure is surfaced
    Recovered(FailureMessage),
    /// The connection must be discarded
    Fatal(DriverError),
}

impl RecoveryOutcome {
    /// True if the session survived.
    pub fn is_recovered(&self) -> bool {
        matches!(self, RecoveryOutcome::Recovered(_))
    }

    /// The error to hand to the caller.
    pub fn into_error(self) -> DriverError {
        match self {
            RecoveryOutcome::Recovered(failure) => failure.into(),
            RecoveryOutcome::Fatal(error) => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{RecordMessage, SuccessMessage};

    #[test]
    fn test_drains_then_acknowledges() {
        let mut recovery = Recovery::start(2);
        assert!(recovery.awaits_response());
        recovery = recovery.on_response(&BoltResponse::Ignored).unwrap();
        assert_eq!(recovery, Recovery::Draining { remaining: 1 });
        recovery = recovery.on_response(&BoltResponse::Ignored).unwrap();
        assert_eq!(recovery, Recovery::Acknowledging);
        assert!(!recovery.awaits_response());
        recovery = recovery.ack_sent().unwrap();
        assert_eq!(recovery, Recovery::AwaitingAck);
        recovery = recovery
            .on_response(&BoltResponse::Success(SuccessMessage::new()))
            .unwrap();
        assert_eq!(recovery, Recovery::Recovered);
    }

    #[test]
    fn test_nothing_outstanding_goes_straight_to_ack() {
        assert_eq!(Recovery::start(0), Recovery::Acknowledging);
    }

    #[test]
    fn test_non_ignored_while_draining_is_desync() {
        let record = BoltResponse::Record(RecordMessage::new(vec![]));
        let err = Recovery::start(1).on_response(&record).unwrap_err();
        assert!(matches!(
            err,
            DriverError::ProtocolDesync { ref expected, ref received }
                if expected == "IGNORED" && received == "RECORD"
        ));
    }

    #[test]
    fn test_ack_must_be_success() {
        let failure = BoltResponse::Failure(FailureMessage::new("Neo.DatabaseError.General.X", "x"));
        let err = Recovery::AwaitingAck.on_response(&failure).unwrap_err();
        assert!(matches!(err, DriverError::ProtocolDesync { .. }));
        assert!(Recovery::AwaitingAck.on_response(&BoltResponse::Ignored).is_err());
    }

    #[test]
    fn test_ack_sent_out_of_order() {
        assert!(matches!(
            Recovery::start(1).ack_sent(),
            Err(DriverError::InvalidState(_))
        ));
    }

    #[test]
    fn test_outcome_error() {
        let failure = FailureMessage::new("Neo.ClientError.Statement.SyntaxError", "bad");
        let outcome = RecoveryOutcome::Recovered(failure);
        assert!(outcome.is_recovered());
        assert!(matches!(outcome.into_error(), DriverError::MessageFailure { .. }));

        let outcome = RecoveryOutcome::Fatal(DriverError::desync("SUCCESS", "IGNORED"));
        assert!(!outcome.is_recovered());
        assert!(outcome.into_error().is_fatal());
    }
}
