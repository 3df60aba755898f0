//! Graph structures carried inside RECORD values.

use std::collections::HashMap;

use super::value::{Structure, Value};
use super::PackStreamError;

/// Node signature ('N')
pub const NODE: u8 = 0x4E;
/// Relationship signature ('R')
pub const RELATIONSHIP: u8 = 0x52;
/// Unbound relationship signature ('r')
pub const UNBOUND_RELATIONSHIP: u8 = 0x72;
/// Path signature ('P')
pub const PATH: u8 = 0x50;

/// Checks a structure's signature and arity, then hands out typed fields.
struct Fields<'a> {
    name: &'static str,
    fields: &'a [Value],
}

impl<'a> Fields<'a> {
    fn open(
        value: &'a Value,
        name: &'static str,
        signature: u8,
        arity: usize,
    ) -> Result<Self, PackStreamError> {
        let s = value
            .as_structure()
            .ok_or_else(|| invalid(format!("expected {} structure, got {}", name, value.type_name())))?;
        if s.signature != signature {
            return Err(invalid(format!(
                "expected {} signature 0x{:02X}, got 0x{:02X}",
                name, signature, s.signature
            )));
        }
        if s.fields.len() != arity {
            return Err(invalid(format!(
                "{} requires {} fields, got {}",
                name,
                arity,
                s.fields.len()
            )));
        }
        Ok(Self {
            name,
            fields: &s.fields,
        })
    }

    fn int(&self, index: usize, what: &str) -> Result<i64, PackStreamError> {
        self.fields[index]
            .as_int()
            .ok_or_else(|| invalid(format!("{} {} must be an integer", self.name, what)))
    }

    fn string(&self, index: usize, what: &str) -> Result<String, PackStreamError> {
        self.fields[index]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("{} {} must be a string", self.name, what)))
    }

    fn map(&self, index: usize, what: &str) -> Result<HashMap<String, Value>, PackStreamError> {
        self.fields[index]
            .as_map()
            .cloned()
            .ok_or_else(|| invalid(format!("{} {} must be a map", self.name, what)))
    }

    fn list(&self, index: usize, what: &str) -> Result<&'a [Value], PackStreamError> {
        self.fields[index]
            .as_list()
            .ok_or_else(|| invalid(format!("{} {} must be a list", self.name, what)))
    }
}

fn invalid(msg: String) -> PackStreamError {
    PackStreamError::InvalidStructure(msg)
}

/// A graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Server-assigned identity
    pub id: i64,
    /// Labels
    pub labels: Vec<String>,
    /// Properties
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// Create a node.
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            labels,
            properties,
        }
    }

    /// True if the node carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Encode as a structure value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            NODE,
            vec![
                Value::Integer(self.id),
                Value::List(self.labels.iter().map(|l| Value::from(l.as_str())).collect()),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Decode from a structure value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let f = Fields::open(value, "Node", NODE, 3)?;
        let labels = f
            .list(1, "labels")?
            .iter()
            .map(|l| {
                l.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("Node label must be a string".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: f.int(0, "id")?,
            labels,
            properties: f.map(2, "properties")?,
        })
    }
}

/// A relationship with both endpoints known.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Server-assigned identity
    pub id: i64,
    /// Start node identity
    pub start_node_id: i64,
    /// End node identity
    pub end_node_id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Properties
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    /// Create a relationship.
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            start_node_id,
            end_node_id,
            rel_type: rel_type.into(),
            properties,
        }
    }

    /// Encode as a structure value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            RELATIONSHIP,
            vec![
                Value::Integer(self.id),
                Value::Integer(self.start_node_id),
                Value::Integer(self.end_node_id),
                Value::from(self.rel_type.as_str()),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Decode from a structure value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let f = Fields::open(value, "Relationship", RELATIONSHIP, 5)?;
        Ok(Self {
            id: f.int(0, "id")?,
            start_node_id: f.int(1, "start id")?,
            end_node_id: f.int(2, "end id")?,
            rel_type: f.string(3, "type")?,
            properties: f.map(4, "properties")?,
        })
    }
}

/// A relationship inside a path, endpoints implied by position.
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    /// Server-assigned identity
    pub id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Properties
    pub properties: HashMap<String, Value>,
}

impl UnboundRelationship {
    /// Create an unbound relationship.
    pub fn new(id: i64, rel_type: impl Into<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            properties,
        }
    }

    /// Encode as a structure value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            UNBOUND_RELATIONSHIP,
            vec![
                Value::Integer(self.id),
                Value::from(self.rel_type.as_str()),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Decode from a structure value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let f = Fields::open(value, "UnboundRelationship", UNBOUND_RELATIONSHIP, 3)?;
        Ok(Self {
            id: f.int(0, "id")?,
            rel_type: f.string(1, "type")?,
            properties: f.map(2, "properties")?,
        })
    }
}

/// A path: distinct nodes, distinct relationships, and an index sequence
/// walking them.
///
/// `sequence` alternates a relationship index and a node index. A positive
/// relationship index `i` means `relationships[i - 1]` traversed forward, a
/// negative one means traversed backward.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Distinct nodes
    pub nodes: Vec<Node>,
    /// Distinct relationships
    pub relationships: Vec<UnboundRelationship>,
    /// Alternating relationship/node indices
    pub sequence: Vec<i64>,
}

impl Path {
    /// Create a path.
    pub fn new(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        sequence: Vec<i64>,
    ) -> Self {
        Self {
            nodes,
            relationships,
            sequence,
        }
    }

    /// First node, if any.
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.sequence.len() / 2
    }

    /// True for a zero-hop path.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Encode as a structure value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            PATH,
            vec![
                Value::List(self.nodes.iter().map(Node::to_value).collect()),
                Value::List(
                    self.relationships
                        .iter()
                        .map(UnboundRelationship::to_value)
                        .collect(),
                ),
                Value::List(self.sequence.iter().copied().map(Value::Integer).collect()),
            ],
        ))
    }

    /// Decode from a structure value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let f = Fields::open(value, "Path", PATH, 3)?;
        let nodes = f
            .list(0, "nodes")?
            .iter()
            .map(Node::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = f
            .list(1, "relationships")?
            .iter()
            .map(UnboundRelationship::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        let sequence = f
            .list(2, "sequence")?
            .iter()
            .map(|v| {
                v.as_int()
                    .ok_or_else(|| invalid("Path sequence must hold integers".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes,
            relationships,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(key: &str, value: Value) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn test_node_roundtrip() {
        let node = Node::new(1, vec!["Node".into()], props("x", Value::Integer(1)));
        assert!(node.has_label("Node"));
        assert_eq!(Node::from_value(&node.to_value()).unwrap(), node);
    }

    #[test]
    fn test_node_rejects_wrong_signature() {
        let rel = Relationship::new(1, 2, 3, "KNOWS", HashMap::new());
        let err = Node::from_value(&rel.to_value()).unwrap_err();
        assert!(matches!(err, PackStreamError::InvalidStructure(_)));
        assert!(Node::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_node_rejects_wrong_arity() {
        let value = Value::Structure(Structure::new(NODE, vec![Value::Integer(1)]));
        assert!(Node::from_value(&value).is_err());
    }

    #[test]
    fn test_relationship_roundtrip() {
        let rel = Relationship::new(5, 1, 2, "KNOWS", props("since", Value::Integer(1999)));
        let decoded = Relationship::from_value(&rel.to_value()).unwrap();
        assert_eq!(decoded.rel_type, "KNOWS");
        assert_eq!(decoded, rel);
    }

    #[test]
    fn test_path_roundtrip() {
        let a = Node::new(1, vec![], HashMap::new());
        let b = Node::new(2, vec![], HashMap::new());
        let r = UnboundRelationship::new(9, "NEXT", HashMap::new());
        let path = Path::new(vec![a.clone(), b], vec![r], vec![1, 1]);
        assert_eq!(path.len(), 1);
        assert_eq!(path.start(), Some(&a));

        let decoded = Path::from_value(&path.to_value()).unwrap();
        assert_eq!(decoded, path);
    }
}
