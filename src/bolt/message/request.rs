//! Bolt V1 request messages.
//!
//! Request messages are sent from the client to the server.

use std::collections::HashMap;

use bytes::BytesMut;

use super::{tag, Signature};
use crate::bolt::packstream::{pack, PackStreamError, Structure, Value};

/// All Bolt V1 request messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// INIT - identify the client and authenticate
    Init(InitMessage),
    /// RUN - submit a statement
    Run(RunMessage),
    /// PULL_ALL - stream every record of the last RUN
    PullAll,
    /// ACK_FAILURE - clear the server's failed state
    AckFailure,
}

impl BoltRequest {
    /// Signature of this request.
    pub fn signature(&self) -> Signature {
        match self {
            BoltRequest::Init(_) => Signature::Init,
            BoltRequest::Run(_) => Signature::Run,
            BoltRequest::PullAll => Signature::PullAll,
            BoltRequest::AckFailure => Signature::AckFailure,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        self.signature().name()
    }

    /// Shorthand for a RUN request.
    pub fn run(statement: impl Into<String>, parameters: HashMap<String, Value>) -> Self {
        BoltRequest::Run(RunMessage::new(statement, parameters))
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        match self {
            BoltRequest::Init(msg) => msg.to_structure(),
            BoltRequest::Run(msg) => msg.to_structure(),
            BoltRequest::PullAll => Structure::new(tag::PULL_ALL, vec![]),
            BoltRequest::AckFailure => Structure::new(tag::ACK_FAILURE, vec![]),
        }
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        match s.signature {
            tag::INIT => Ok(BoltRequest::Init(InitMessage::from_structure(s)?)),
            tag::RUN => Ok(BoltRequest::Run(RunMessage::from_structure(s)?)),
            tag::PULL_ALL => Ok(BoltRequest::PullAll),
            tag::ACK_FAILURE => Ok(BoltRequest::AckFailure),
            other => Err(PackStreamError::InvalidStructure(format!(
                "Unknown request signature: 0x{:02X}",
                other
            ))),
        }
    }

    /// Encode to PackStream bytes, ready for chunking.
    pub fn encode(&self) -> Result<BytesMut, PackStreamError> {
        pack(&Value::Structure(self.to_structure()))
    }
}

/// INIT message.
#[derive(Debug, Clone, PartialEq)]
pub struct InitMessage {
    /// Client identity, e.g. `bolt-v1-client/0.1.0`
    pub user_agent: String,
    /// Authentication map (`scheme`, `principal`, `credentials`, ...)
    pub auth: HashMap<String, Value>,
}

impl InitMessage {
    /// Create an INIT message.
    pub fn new(user_agent: impl Into<String>, auth: HashMap<String, Value>) -> Self {
        Self {
            user_agent: user_agent.into(),
            auth,
        }
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(
            tag::INIT,
            vec![
                Value::from(self.user_agent.as_str()),
                Value::Map(self.auth.clone()),
            ],
        )
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        if s.signature != tag::INIT || s.len() != 2 {
            return Err(PackStreamError::InvalidStructure(
                "INIT requires user agent and auth map".to_string(),
            ));
        }
        let user_agent = s.fields[0].as_str().ok_or_else(|| {
            PackStreamError::InvalidStructure("INIT user agent must be a string".to_string())
        })?;
        let auth = s.fields[1].as_map().ok_or_else(|| {
            PackStreamError::InvalidStructure("INIT auth must be a map".to_string())
        })?;
        Ok(Self::new(user_agent, auth.clone()))
    }
}

/// RUN message.
///
/// The tag correlates results on the client; it never goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Statement text
    pub statement: String,
    /// Statement parameters
    pub parameters: HashMap<String, Value>,
    /// Client-side correlation tag
    pub tag: Option<String>,
}

impl RunMessage {
    /// Create a RUN message without a tag.
    pub fn new(statement: impl Into<String>, parameters: HashMap<String, Value>) -> Self {
        Self {
            statement: statement.into(),
            parameters,
            tag: None,
        }
    }

    /// Attach a correlation tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(
            tag::RUN,
            vec![
                Value::from(self.statement.as_str()),
                Value::Map(self.parameters.clone()),
            ],
        )
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        if s.signature != tag::RUN || s.len() != 2 {
            return Err(PackStreamError::InvalidStructure(
                "RUN requires statement and parameters".to_string(),
            ));
        }
        let statement = s.fields[0].as_str().ok_or_else(|| {
            PackStreamError::InvalidStructure("RUN statement must be a string".to_string())
        })?;
        let parameters = s.fields[1].as_map().ok_or_else(|| {
            PackStreamError::InvalidStructure("RUN parameters must be a map".to_string())
        })?;
        Ok(Self::new(statement, parameters.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::unpack;

    #[test]
    fn test_pull_all_bytes() {
        assert_eq!(&BoltRequest::PullAll.encode().unwrap()[..], &[0xB0, 0x3F]);
        assert_eq!(&BoltRequest::AckFailure.encode().unwrap()[..], &[0xB0, 0x0E]);
    }

    #[test]
    fn test_run_bytes() {
        let bytes = BoltRequest::run("RETURN 1", HashMap::new()).encode().unwrap();
        let mut expected = vec![0xB2, 0x10, 0x88];
        expected.extend_from_slice(b"RETURN 1");
        expected.push(0xA0);
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_run_tag_not_encoded() {
        let tagged = BoltRequest::Run(RunMessage::new("RETURN 1", HashMap::new()).with_tag("t1"));
        let plain = BoltRequest::run("RETURN 1", HashMap::new());
        assert_eq!(tagged.encode().unwrap(), plain.encode().unwrap());
    }

    #[test]
    fn test_init_roundtrip() {
        let mut auth = HashMap::new();
        auth.insert("scheme".to_string(), Value::from("basic"));
        auth.insert("principal".to_string(), Value::from("neo4j"));
        let init = BoltRequest::Init(InitMessage::new("client/1.0", auth));

        let bytes = init.encode().unwrap();
        assert_eq!(&bytes[..2], &[0xB2, 0x01]);

        let value = unpack(&bytes).unwrap();
        let decoded = BoltRequest::from_structure(value.as_structure().unwrap()).unwrap();
        assert_eq!(decoded, init);
        assert_eq!(decoded.name(), "INIT");
    }

    #[test]
    fn test_from_structure_rejects_unknown() {
        let s = Structure::new(0x70, vec![]);
        assert!(BoltRequest::from_structure(&s).is_err());
        let bad_run = Structure::new(tag::RUN, vec![Value::Integer(1)]);
        assert!(RunMessage::from_structure(&bad_run).is_err());
    }
}
