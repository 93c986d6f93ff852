//! The typed document tree produced by parsing.
//!
//! Every construct in a document becomes a [`Node`]: a type name, a payload,
//! and a map of attributes. The payload distinguishes the four structural
//! shapes a node can take. Leaves carry final text in [`Payload::Raw`],
//! containers carry child nodes in [`Payload::Children`], and markers carry
//! nothing. [`Payload::Text`] holds text that still awaits the inline pass;
//! it only ever appears between the block pass and inline resolution, so a
//! finished tree never contains it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Attribute values attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Node attributes, keyed by name.
pub type Attrs = BTreeMap<String, AttrValue>;

/// The structural payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload. Markers such as thematic breaks and blank lines.
    None,
    /// Final text, not subject to any further parsing.
    Raw(String),
    /// Source text that the inline pass has not consumed yet.
    Text(String),
    /// Child nodes.
    Children(Vec<Node>),
}

/// A single node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The node type, e.g. `"paragraph"` or `"codespan"`.
    pub kind: String,
    pub payload: Payload,
    pub attrs: Attrs,
}

impl Node {
    /// Creates a marker node with no payload.
    pub fn marker(kind: &str) -> Self {
        Node {
            kind: kind.to_string(),
            payload: Payload::None,
            attrs: Attrs::new(),
        }
    }

    /// Creates a leaf node holding final text.
    pub fn raw(kind: &str, raw: impl Into<String>) -> Self {
        Node {
            kind: kind.to_string(),
            payload: Payload::Raw(raw.into()),
            attrs: Attrs::new(),
        }
    }

    /// Creates a node holding text that the inline pass will consume.
    pub fn text(kind: &str, text: impl Into<String>) -> Self {
        Node {
            kind: kind.to_string(),
            payload: Payload::Text(text.into()),
            attrs: Attrs::new(),
        }
    }

    /// Creates a container node with the given children.
    pub fn container(kind: &str, children: Vec<Node>) -> Self {
        Node {
            kind: kind.to_string(),
            payload: Payload::Children(children),
            attrs: Attrs::new(),
        }
    }

    /// Sets an attribute and returns the node, for chained construction.
    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn attr_int(&self, name: &str) -> Option<i64> {
        match self.attrs.get(name) {
            Some(AttrValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        match self.attrs.get(name) {
            Some(AttrValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Child nodes, if this is a container.
    pub fn children(&self) -> Option<&[Node]> {
        match &self.payload {
            Payload::Children(children) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.payload {
            Payload::Children(children) => Some(children),
            _ => None,
        }
    }

    /// Final text, if this is a leaf.
    pub fn as_raw(&self) -> Option<&str> {
        match &self.payload {
            Payload::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// Unconsumed source text, if the inline pass has not run yet.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut len = 1;
        if !matches!(self.payload, Payload::None) {
            len += 1;
        }
        if !self.attrs.is_empty() {
            len += 1;
        }
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", &self.kind)?;
        match &self.payload {
            Payload::None => {}
            Payload::Raw(raw) => map.serialize_entry("raw", raw)?,
            Payload::Text(text) => map.serialize_entry("text", text)?,
            Payload::Children(children) => map.serialize_entry("children", children)?,
        }
        if !self.attrs.is_empty() {
            map.serialize_entry("attrs", &self.attrs)?;
        }
        map.end()
    }
}
