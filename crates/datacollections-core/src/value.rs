//! Dynamic field values and collection keys.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// A collection key.
///
/// Collections are keyed either by position or by name. String keys that
/// spell a canonical integer (`"3"`, `"-7"`, but not `"03"` or `"+3"`) are
/// normalized to [`Key::Int`], so `"3"` and `3` address the same element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Positional or numeric key
    Int(i64),
    /// Named key
    Str(String),
}

impl Key {
    /// Parse a string key, normalizing canonical integers.
    pub fn parse(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(i) if i.to_string() == s => Key::Int(i),
            _ => Key::Str(s.to_string()),
        }
    }

    /// Derive a key from a scalar value (integers and text only).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Text(s) => Some(Key::parse(s)),
            _ => None,
        }
    }

    /// Get the integer form of this key, if any.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Str(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::parse(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::parse(&s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::parse(s)
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        // Positions beyond i64::MAX cannot exist in memory.
        Key::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

/// A dynamically-typed field value.
///
/// Database rows hold scalars only; composite values travel through a
/// collection in their serialized storage form (see
/// [`Serializer`](crate::serialize::Serializer)) and surface as
/// [`Value::Array`] once decoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// NULL value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Text string
    Text(String),

    /// Ordered composite keyed by position or name
    Array(IndexMap<Key, Value>),
}

impl Value {
    /// Build a list (keys `0..n`) from an iterator of values.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::from(i), v.into()))
                .collect(),
        )
    }

    /// Build a keyed composite from an iterator of pairs.
    pub fn map<K: Into<Key>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Array(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a scalar (bool, number or text; NULL is not a scalar).
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_)
        )
    }

    /// Check if this value is a composite.
    pub const fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64 (numeric text is parsed).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the elements of a composite value.
    pub fn as_array(&self) -> Option<&IndexMap<Key, Value>> {
        match self {
            Value::Array(map) => Some(map),
            _ => None,
        }
    }

    /// Compare two values the way a loosely typed data source does:
    /// `Int(42)` matches `Text("42")`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (Key::from_value(self), Key::from_value(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Convert into a JSON value.
    ///
    /// Composites whose keys are exactly `0..n` in order become JSON arrays,
    /// every other composite becomes a JSON object. Non-finite floats cannot be
    /// represented and yield `TypeNotAllowed`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    Error::type_not_allowed(
                        None,
                        format!("non-finite float {}", f),
                        "JSON cannot represent NaN or infinity",
                    )
                })?,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Array(map) => {
                if is_list(map) {
                    serde_json::Value::Array(
                        map.values().map(Value::to_json).collect::<Result<_>>()?,
                    )
                } else {
                    let mut obj = serde_json::Map::with_capacity(map.len());
                    for (k, v) in map {
                        obj.insert(k.to_string(), v.to_json()?);
                    }
                    serde_json::Value::Object(obj)
                }
            }
        })
    }
}

/// Check whether a composite's keys are exactly `0..n` in order.
pub fn is_list(map: &IndexMap<Key, Value>) -> bool {
    map.keys()
        .enumerate()
        .all(|(i, k)| k.as_int() == i64::try_from(i).ok())
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        match k {
            Key::Int(i) => Value::Int(i),
            Key::Str(s) => Value::Text(s),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v)
    }
}

impl From<IndexMap<Key, Value>> for Value {
    fn from(v: IndexMap<Key, Value>) -> Self {
        Value::Array(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::list(items),
            serde_json::Value::Object(obj) => {
                Value::Array(obj.into_iter().map(|(k, v)| (Key::parse(&k), v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_integer_keys_are_normalized() {
        assert_eq!(Key::from("3"), Key::Int(3));
        assert_eq!(Key::from("-7"), Key::Int(-7));
        assert_eq!(Key::from("03"), Key::Str("03".to_string()));
        assert_eq!(Key::from("+3"), Key::Str("+3".to_string()));
        assert_eq!(Key::from("name"), Key::Str("name".to_string()));
    }

    #[test]
    fn scalar_classification() {
        assert!(Value::from(42).is_scalar());
        assert!(Value::from("active").is_scalar());
        assert!(Value::from(false).is_scalar());
        assert!(!Value::Null.is_scalar());
        assert!(!Value::list([1, 2]).is_scalar());
        assert!(Value::list([1, 2]).is_composite());
    }

    #[test]
    fn loose_equality_matches_numeric_text() {
        assert!(Value::Int(42).loose_eq(&Value::Text("42".to_string())));
        assert!(!Value::Int(42).loose_eq(&Value::Text("042".to_string())));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
    }

    #[test]
    fn lists_become_json_arrays_and_maps_objects() {
        let list = Value::list([3, 7]);
        assert_eq!(list.to_json().unwrap(), serde_json::json!([3, 7]));

        let map = Value::map([("a", Value::Int(1)), ("b", Value::from("x"))]);
        assert_eq!(map.to_json().unwrap(), serde_json::json!({"a": 1, "b": "x"}));

        let sparse = Value::map([(1_i64, "one"), (0_i64, "zero")]);
        assert_eq!(
            sparse.to_json().unwrap(),
            serde_json::json!({"1": "one", "0": "zero"})
        );
    }

    #[test]
    fn non_finite_floats_are_refused() {
        let err = Value::list([f64::NAN]).to_json().unwrap_err();
        assert!(matches!(err, Error::TypeNotAllowed(_)));
    }

    #[test]
    fn json_objects_keep_order_and_normalize_keys() {
        let json = serde_json::json!({"0": "a", "name": "b"});
        let value = Value::from(json);
        let map = value.as_array().unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Key::Int(0), Key::Str("name".to_string())]);
    }
}
