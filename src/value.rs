//! Attribute values held by catalog frames and observed as evidence.
//!
//! Catalog attributes are strings, booleans or integers. Matching is always
//! done on the normalized form (trimmed, lower-cased text), so the index and
//! every lookup agree on what "the same value" means.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed attribute value.
///
/// # Examples
///
/// ```
/// use autoguess::Value;
///
/// let fuel = Value::from("  Electric ");
/// assert_eq!(fuel.normalized(), Value::from("electric"));
/// assert!(Value::Bool(true).is_bool());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the matching form of this value.
    ///
    /// Text is trimmed and lower-cased; booleans and integers are unchanged.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Text(v) => Self::Text(normalize_text(v)),
            other => other.clone(),
        }
    }

    /// Returns true if both values are equal after normalization.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => normalize_text(a) == normalize_text(b),
            _ => self == other,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
        }
    }
}

/// Normalizes free text for matching: trims and lower-cases.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_and_lowercases_text() {
        let v = Value::from("  SUV ");
        assert_eq!(v.normalized(), Value::Text("suv".to_string()));
    }

    #[test]
    fn normalized_keeps_non_text_values() {
        assert_eq!(Value::Bool(true).normalized(), Value::Bool(true));
        assert_eq!(Value::Int(1197).normalized(), Value::Int(1197));
    }

    #[test]
    fn matches_ignores_case_and_whitespace() {
        assert!(Value::from("Hatchback").matches(&Value::from(" hatchback")));
        assert!(!Value::from("sedan").matches(&Value::from("suv")));
    }

    #[test]
    fn matches_does_not_cross_types() {
        assert!(!Value::Bool(true).matches(&Value::Int(1)));
        assert!(!Value::from("true").matches(&Value::Bool(true)));
    }

    #[test]
    fn display_is_plain() {
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::from("petrol").to_string(), "petrol");
    }

    #[test]
    fn accessors_reject_other_types() {
        let v = Value::Int(3);
        assert_eq!(v.as_int(), Some(3));
        assert!(v.as_bool().is_none());
        assert!(v.as_text().is_none());
        assert_eq!(v.type_name(), "int");
    }

    #[test]
    fn value_serialization_is_tagged() {
        let json = serde_json::to_string(&Value::from("diesel")).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::from("diesel"));
    }
}
