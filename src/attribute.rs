use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The stored value of a node or edge attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// Attribute record of a single node or edge. Absence of a key is the
/// "no value" sentinel; no variant encodes null.
pub type AttrMap = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers widen to `f64`; strings and
    /// booleans do not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Int(value) => Some(*value as f64),
            AttrValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, AttrValue::Int(_) | AttrValue::Float(_))
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(value) => write!(f, "{}", value),
            AttrValue::Float(value) => write!(f, "{}", value),
            AttrValue::Str(value) => write!(f, "{}", value),
            AttrValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
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

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

#[cfg(test)]
mod test_attribute {
    use crate::attribute::AttrValue;

    #[test]
    fn test_typed_accessors() {
        let v = AttrValue::Int(3);
        assert_eq!(v.as_int(), Some(3));
        assert_eq!(v.as_number(), Some(3.0));
        assert_eq!(v.as_float(), None);
        assert_eq!(v.as_str(), None);

        let s = AttrValue::from("red");
        assert_eq!(s.as_str(), Some("red"));
        assert_eq!(s.as_number(), None);
        assert!(!s.is_numeric());
    }
}
