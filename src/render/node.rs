//! Typed view of the nested status/config payloads the frontend returns

use serde_json::Value;
use std::fmt;

use crate::core::error::Result;

/// Leaf value of a payload
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// A payload value: scalar, ordered sequence, or key-ordered mapping.
///
/// Mapping keys are unique and keep the order the server sent them in.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceNode {
    Scalar(Scalar),
    Sequence(Vec<ResourceNode>),
    Mapping(Vec<(String, ResourceNode)>),
}

impl ResourceNode {
    /// Parse a response body.
    ///
    /// Nesting is capped at serde_json's recursion limit of 128 levels; deeper
    /// bodies are rejected as JSON errors. `From<Value>`, `to_value` and drop
    /// recurse per level, so payloads stay within that bound when built from
    /// the wire.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from(value))
    }

    pub fn string(s: impl Into<String>) -> Self {
        ResourceNode::Scalar(Scalar::String(s.into()))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, ResourceNode::Mapping(_))
    }

    pub fn as_mapping(&self) -> Option<&[(String, ResourceNode)]> {
        match self {
            ResourceNode::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ResourceNode]> {
        match self {
            ResourceNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResourceNode::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Value under `key` when this is a mapping
    pub fn get(&self, key: &str) -> Option<&ResourceNode> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Total number of nodes, this one included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            match node {
                ResourceNode::Scalar(_) => {}
                ResourceNode::Sequence(items) => stack.extend(items.iter()),
                ResourceNode::Mapping(entries) => stack.extend(entries.iter().map(|(_, v)| v)),
            }
        }
        count
    }
}

impl ResourceNode {
    /// Back to a JSON value, keeping mapping order
    pub fn to_value(&self) -> Value {
        match self {
            ResourceNode::Scalar(Scalar::Null) => Value::Null,
            ResourceNode::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            ResourceNode::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            ResourceNode::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            ResourceNode::Sequence(items) => {
                Value::Array(items.iter().map(ResourceNode::to_value).collect())
            }
            ResourceNode::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ResourceNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResourceNode::Scalar(Scalar::Null),
            Value::Bool(b) => ResourceNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => ResourceNode::Scalar(Scalar::Number(n)),
            Value::String(s) => ResourceNode::Scalar(Scalar::String(s)),
            Value::Array(items) => {
                ResourceNode::Sequence(items.into_iter().map(ResourceNode::from).collect())
            }
            Value::Object(map) => ResourceNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ResourceNode::from(v)))
                    .collect(),
            ),
        }
    }
}
