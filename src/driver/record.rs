//! One result row.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::bolt::packstream::{Node, Path, Relationship};
use crate::bolt::Value;

/// A RECORD's values keyed by the RUN's field names.
///
/// Rows of one result share a single key list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Pair `values` with `keys`.
    pub fn new(keys: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// Field names.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Row values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an empty row.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .and_then(|i| self.values.get(i))
    }

    /// Value at `index`.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// True if `key` is one of the fields.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Integer value for `key`.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// String value for `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Node value for `key`.
    pub fn get_node(&self, key: &str) -> Option<Node> {
        self.get(key).and_then(|v| Node::from_value(v).ok())
    }

    /// Relationship value for `key`.
    pub fn get_relationship(&self, key: &str) -> Option<Relationship> {
        self.get(key).and_then(|v| Relationship::from_value(v).ok())
    }

    /// Path value for `key`.
    pub fn get_path(&self, key: &str) -> Option<Path> {
        self.get(key).and_then(|v| Path::from_value(v).ok())
    }

    /// Copy into a map.
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.keys.iter().zip(&self.values).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
        }
        f.write_str("}")
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}
