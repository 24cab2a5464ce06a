//! Primitive values carried in metrics samples and scenario parameters

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single reading or parameter value.
///
/// Kept externally tagged so it survives bincode, which cannot decode
/// self-describing (untagged) representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Flat mapping of named readings reported by an agent
pub type Metrics = BTreeMap<String, Primitive>;

/// Opaque scenario parameters passed from orchestrator to agent
pub type Params = BTreeMap<String, Primitive>;

impl Primitive {
    /// Numeric view of the value; booleans and text have none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Primitive::Int(v) => Some(*v as f64),
            Primitive::Float(v) => Some(*v),
            Primitive::Bool(_) | Primitive::Text(_) => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(v) => write!(f, "{}", v),
            Primitive::Int(v) => write!(f, "{}", v),
            Primitive::Float(v) => write!(f, "{}", v),
            Primitive::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Int(v)
    }
}

impl From<u32> for Primitive {
    fn from(v: u32) -> Self {
        Primitive::Int(v as i64)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::Text(v.to_string())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::Text(v)
    }
}
