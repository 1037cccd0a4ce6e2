//! Typed column values.
//!
//! Every entity exposes its columns as `Value`s so that predicates can be rendered to SQL
//! parameters and evaluated against in-memory rows with the same semantics.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// A nullable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Timestamp(Option<DateTime<Utc>>),
    Bytes(Option<Vec<u8>>),
    Json(Option<serde_json::Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Self::Bool(v) => v.is_none(),
            Self::Int(v) => v.is_none(),
            Self::Float(v) => v.is_none(),
            Self::Text(v) => v.is_none(),
            Self::Uuid(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::Bytes(v) => v.is_none(),
            Self::Json(v) => v.is_none(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Orders two non-null values of compatible types. Nulls and mismatched types
    /// compare as `None`, like SQL comparisons against NULL.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(Some(a)), Self::Bool(Some(b))) => Some(a.cmp(b)),
            (Self::Int(Some(a)), Self::Int(Some(b))) => Some(a.cmp(b)),
            (Self::Float(Some(a)), Self::Float(Some(b))) => a.partial_cmp(b),
            (Self::Int(Some(a)), Self::Float(Some(b))) => (*a as f64).partial_cmp(b),
            (Self::Float(Some(a)), Self::Int(Some(b))) => a.partial_cmp(&(*b as f64)),
            (Self::Text(Some(a)), Self::Text(Some(b))) => Some(a.cmp(b)),
            (Self::Uuid(Some(a)), Self::Uuid(Some(b))) => Some(a.cmp(b)),
            (Self::Timestamp(Some(a)), Self::Timestamp(Some(b))) => Some(a.cmp(b)),
            (Self::Bytes(Some(a)), Self::Bytes(Some(b))) => Some(a.cmp(b)),
            (Self::Json(Some(a)), Self::Json(Some(b))) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Ordering used for sorting: nulls sort after every value, as Postgres does for ASC.
    pub(crate) fn sort_order(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

macro_rules! impl_value_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(Some(value.into()))
            }
        }

        impl From<Option<$ty>> for Value {
            fn from(value: Option<$ty>) -> Self {
                Value::$variant(value.map(Into::into))
            }
        }
    };
}

impl_value_from!(bool, Bool);
impl_value_from!(i32, Int);
impl_value_from!(i64, Int);
impl_value_from!(f64, Float);
impl_value_from!(String, Text);
impl_value_from!(Uuid, Uuid);
impl_value_from!(DateTime<Utc>, Timestamp);
impl_value_from!(Vec<u8>, Bytes);
impl_value_from!(serde_json::Value, Json);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(Some(value.to_string()))
    }
}

impl From<Option<&str>> for Value {
    fn from(value: Option<&str>) -> Self {
        Value::Text(value.map(str::to_string))
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(Some(value.clone()))
    }
}

impl From<&Option<String>> for Value {
    fn from(value: &Option<String>) -> Self {
        Value::Text(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_comparisons_are_undefined() {
        assert_eq!(Value::Int(None).compare(&Value::Int(Some(1))), None);
        assert_eq!(Value::Text(Some("a".into())).compare(&Value::Int(Some(1))), None);
    }

    #[test]
    fn test_mixed_numeric_comparison() {
        assert_eq!(Value::from(2i64).compare(&Value::from(2.5f64)), Some(Ordering::Less));
    }

    #[test]
    fn test_nulls_sort_last() {
        let mut values = vec![Value::Int(None), Value::from(3i64), Value::from(1i64)];
        values.sort_by(|a, b| a.sort_order(b));
        assert_eq!(values, vec![Value::from(1i64), Value::from(3i64), Value::Int(None)]);
    }
}
