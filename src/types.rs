use std::fmt;
use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Vertex identifier, unique in a graph. Node ids are kept as strings so
/// loaders can preserve whatever labels the source file carries.
pub type NodeId = String;

/// Canonical key of an undirected edge: the lexicographically smaller
/// endpoint always comes first, so `(u, v)` and `(v, u)` hit the same entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    a: NodeId,
    b: NodeId,
}

impl EdgeKey {
    pub fn new(u: &str, v: &str) -> EdgeKey {
        if u <= v {
            EdgeKey { a: u.to_string(), b: v.to_string() }
        } else {
            EdgeKey { a: v.to_string(), b: u.to_string() }
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }
}

impl Display for EdgeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

/// Failure kinds surfaced by the analysis engine.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("structural error: {0}")]
    Structural(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
