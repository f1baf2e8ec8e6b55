//! The document tree

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde_yaml::Value;

use super::address::{Address, Segment};

/// Insertion-ordered mapping node
pub type Mapping = IndexMap<String, Document>;

/// A configuration document: maps, sequences and scalar leaves
///
/// The same type represents both the unresolved input (which may contain
/// provider tags) and the resolved output. `Bytes` leaves only ever appear as
/// the result of a binary fetch; parsed input never contains them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Document {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`
    Unsigned(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<Document>),
    Map(Mapping),
}

impl Document {
    /// Parse a YAML (or JSON, which is a YAML subset) string
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(text)?;
        Ok(Self::from(value))
    }

    /// Human-readable node kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Integer(_) | Document::Unsigned(_) => "integer",
            Document::Float(_) => "float",
            Document::Text(_) => "text",
            Document::Bytes(_) => "bytes",
            Document::Seq(_) => "sequence",
            Document::Map(_) => "mapping",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Document::Seq(_) | Document::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Document::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Document::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Document]> {
        match self {
            Document::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this node is a mapping holding `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.as_map().is_some_and(|map| map.contains_key(key))
    }

    /// Direct child lookup by a single segment
    pub fn child(&self, segment: &Segment) -> Option<&Document> {
        match (self, segment) {
            (Document::Map(map), Segment::Key(key)) => map.get(key),
            (Document::Seq(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Document> {
        match (self, segment) {
            (Document::Map(map), Segment::Key(key)) => map.get_mut(key),
            (Document::Seq(items), Segment::Index(index)) => items.get_mut(*index),
            _ => None,
        }
    }

    /// Node at `address`, if it exists
    pub fn get(&self, address: &Address) -> Option<&Document> {
        address
            .segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Mutable node at `address`, if it exists
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Document> {
        address
            .segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Convert back into a serializable YAML value
    ///
    /// Byte leaves are emitted as standard base64 text.
    pub fn to_yaml_value(&self) -> Value {
        match self {
            Document::Null => Value::Null,
            Document::Bool(b) => Value::Bool(*b),
            Document::Integer(i) => Value::Number((*i).into()),
            Document::Unsigned(u) => Value::Number((*u).into()),
            Document::Float(f) => Value::Number((*f).into()),
            Document::Text(text) => Value::String(text.clone()),
            Document::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
            Document::Seq(items) => Value::Sequence(items.iter().map(Document::to_yaml_value).collect()),
            Document::Map(map) => Value::Mapping(
                map.iter()
                    .map(|(key, value)| (Value::String(key.clone()), value.to_yaml_value()))
                    .collect(),
            ),
        }
    }

    /// Flatten into `dotted.path -> leaf` pairs, in document order
    ///
    /// Sequence elements use their index as the path component, so
    /// `{a: {b: [x]}}` flattens to `a.b.0 -> x`. Empty containers produce no
    /// entries. This is the view handed to template rendering.
    pub fn flatten(&self) -> IndexMap<String, Document> {
        let mut out = IndexMap::new();
        flatten_into(self, "", &mut out);
        out
    }
}

fn flatten_into(node: &Document, prefix: &str, out: &mut IndexMap<String, Document>) {
    let join = |component: &str| {
        if prefix.is_empty() {
            component.to_string()
        } else {
            format!("{}.{}", prefix, component)
        }
    };

    match node {
        Document::Map(map) => {
            for (key, child) in map {
                flatten_into(child, &join(key), out);
            }
        }
        Document::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, &join(&index.to_string()), out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

fn key_to_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => key_to_string(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Document::Null,
            Value::Bool(b) => Document::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Document::Integer(i),
                (None, Some(u)) => Document::Unsigned(u),
                (None, None) => Document::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Document::Text(s),
            Value::Sequence(items) => Document::Seq(items.into_iter().map(Document::from).collect()),
            Value::Mapping(map) => Document::Map(
                map.into_iter()
                    .map(|(key, value)| (key_to_string(key), Document::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Document::from(tagged.value),
        }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Text(text.to_string())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Text(text)
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Document::Bytes(bytes)
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Document::Bool(b)
    }
}

impl From<i64> for Document {
    fn from(i: i64) -> Self {
        Document::Integer(i)
    }
}

impl From<Mapping> for Document {
    fn from(map: Mapping) -> Self {
        Document::Map(map)
    }
}

impl FromIterator<(String, Document)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Document)>>(iter: I) -> Self {
        Document::Map(iter.into_iter().collect())
    }
}
