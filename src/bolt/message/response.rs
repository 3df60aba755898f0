//! Bolt V1 response messages.
//!
//! Response messages are sent from the server to the client.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use super::{tag, Signature};
use crate::bolt::packstream::{pack, unpack, PackStreamError, Structure, Value};

/// All Bolt V1 response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - request completed
    Success(SuccessMessage),
    /// RECORD - one result row
    Record(RecordMessage),
    /// FAILURE - request failed; the connection is now in a failed state
    Failure(FailureMessage),
    /// IGNORED - request skipped because an earlier one failed
    Ignored,
}

impl BoltResponse {
    /// Signature of this response.
    pub fn signature(&self) -> Signature {
        match self {
            BoltResponse::Success(_) => Signature::Success,
            BoltResponse::Record(_) => Signature::Record,
            BoltResponse::Failure(_) => Signature::Failure,
            BoltResponse::Ignored => Signature::Ignored,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        self.signature().name()
    }

    /// True for SUCCESS, FAILURE and IGNORED; RECORD never ends a response.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BoltResponse::Record(_))
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        match self {
            BoltResponse::Success(msg) => msg.to_structure(),
            BoltResponse::Record(msg) => msg.to_structure(),
            BoltResponse::Failure(msg) => msg.to_structure(),
            BoltResponse::Ignored => Structure::new(tag::IGNORED, vec![]),
        }
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        match s.signature {
            tag::SUCCESS => Ok(BoltResponse::Success(SuccessMessage::from_structure(s)?)),
            tag::RECORD => Ok(BoltResponse::Record(RecordMessage::from_structure(s)?)),
            tag::FAILURE => Ok(BoltResponse::Failure(FailureMessage::from_structure(s)?)),
            tag::IGNORED => Ok(BoltResponse::Ignored),
            other => Err(PackStreamError::InvalidStructure(format!(
                "Unknown response signature: 0x{:02X}",
                other
            ))),
        }
    }

    /// Encode to PackStream bytes.
    pub fn encode(&self) -> Result<BytesMut, PackStreamError> {
        pack(&Value::Structure(self.to_structure()))
    }
}

/// A defragmented message body that has not been decoded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(pub Bytes);

impl RawMessage {
    /// Wrap message bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Body bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Body length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty body.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signature byte, read without decoding the body.
    pub fn signature_byte(&self) -> Option<u8> {
        match self.0.first() {
            Some(marker) if (0xB0..=0xBF).contains(marker) => self.0.get(1).copied(),
            _ => None,
        }
    }

    /// Decode into a response.
    pub fn decode(&self) -> Result<BoltResponse, PackStreamError> {
        match unpack(&self.0)? {
            Value::Structure(s) => BoltResponse::from_structure(&s),
            other => Err(PackStreamError::InvalidStructure(format!(
                "expected message structure, got {}",
                other.type_name()
            ))),
        }
    }
}

/// SUCCESS message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: HashMap<String, Value>,
}

impl SuccessMessage {
    /// SUCCESS with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// SUCCESS with the given metadata.
    pub fn with_metadata(metadata: HashMap<String, Value>) -> Self {
        Self { metadata }
    }

    /// Builder-style metadata insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Server agent string (INIT response).
    pub fn server(&self) -> Option<&str> {
        self.get("server").and_then(Value::as_str)
    }

    /// Column names (RUN response).
    pub fn fields(&self) -> Option<Vec<String>> {
        self.get("fields").and_then(Value::to_string_list)
    }

    /// Update statistics (PULL_ALL response).
    pub fn stats(&self) -> Option<&HashMap<String, Value>> {
        self.get("stats").and_then(Value::as_map)
    }

    /// Statement type code (`r`, `rw`, `w`, `s`).
    pub fn query_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    /// Milliseconds until the first record was available.
    pub fn result_available_after(&self) -> Option<i64> {
        self.get("result_available_after").and_then(Value::as_int)
    }

    /// Milliseconds until the last record was consumed.
    pub fn result_consumed_after(&self) -> Option<i64> {
        self.get("result_consumed_after").and_then(Value::as_int)
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(tag::SUCCESS, vec![Value::Map(self.metadata.clone())])
    }

    /// Parse from a PackStream structure; missing metadata means empty.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        let metadata = match s.field(0) {
            None => HashMap::new(),
            Some(Value::Map(map)) => map.clone(),
            Some(other) => {
                return Err(PackStreamError::InvalidStructure(format!(
                    "SUCCESS metadata must be a map, got {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self { metadata })
    }
}

/// RECORD message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMessage {
    /// Row values, positionally matching the RUN fields
    pub fields: Vec<Value>,
}

impl RecordMessage {
    /// Create a RECORD message.
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for an empty row.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(tag::RECORD, vec![Value::List(self.fields.clone())])
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        match s.field(0) {
            None => Ok(Self::default()),
            Some(Value::List(values)) => Ok(Self::new(values.clone())),
            Some(other) => Err(PackStreamError::InvalidStructure(format!(
                "RECORD values must be a list, got {}",
                other.type_name()
            ))),
        }
    }
}

/// FAILURE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl FailureMessage {
    /// Create a FAILURE message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classification segment of the code (`ClientError`, `TransientError`, ...).
    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("Unknown")
    }

    /// Category segment of the code (`Statement`, `Security`, ...).
    pub fn category(&self) -> &str {
        self.code.split('.').nth(2).unwrap_or("Unknown")
    }

    /// Caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        self.classification() == "ClientError"
    }

    /// May succeed if retried.
    pub fn is_transient(&self) -> bool {
        self.classification() == "TransientError"
    }

    /// Caused by the database.
    pub fn is_database_error(&self) -> bool {
        self.classification() == "DatabaseError"
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        let mut metadata = HashMap::new();
        metadata.insert("code".to_string(), Value::from(self.code.as_str()));
        metadata.insert("message".to_string(), Value::from(self.message.as_str()));
        Structure::new(tag::FAILURE, vec![Value::Map(metadata)])
    }

    /// Parse from a PackStream structure; absent entries become empty strings.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        let metadata = s.field(0).and_then(Value::as_map).ok_or_else(|| {
            PackStreamError::InvalidStructure("FAILURE requires a metadata map".to_string())
        })?;
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(Self::new(text("code"), text("message")))
    }
}
