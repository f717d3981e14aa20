//! Conversion between composite values and their flat storage form.
//!
//! Collections never hold a composite directly after a write: the value is
//! passed through [`Serializer::serialize`] first and decoded again with
//! [`Serializer::unserialize`] on read.

use crate::error::Result;
use crate::value::Value;
use std::fmt;

/// Converts values between their native and their flat storage form.
pub trait Serializer: fmt::Debug {
    /// Encode a value into its storage form.
    ///
    /// Scalars and NULL pass through unchanged; composites become a single
    /// scalar. Values that cannot be encoded yield `TypeNotAllowed`.
    fn serialize(&self, value: &Value) -> Result<Value>;

    /// Decode a stored value.
    ///
    /// Returns a [`Value::Array`] when the stored value is an encoded
    /// composite, otherwise the value itself. Undecodable input is returned
    /// unchanged rather than failing.
    fn unserialize(&self, value: &Value) -> Value;
}

/// Stores composites as JSON text.
///
/// Only text starting with `[` or `{` (after leading whitespace) is treated
/// as a candidate for decoding, so ordinary text values are never parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Create a new JSON serializer.
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Array(_) => {
                let json = value.to_json()?;
                Ok(Value::Text(serde_json::to_string(&json)?))
            }
            other => Ok(other.clone()),
        }
    }

    fn unserialize(&self, value: &Value) -> Value {
        let Value::Text(text) = value else {
            return value.clone();
        };

        let trimmed = text.trim_start();
        if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
            return value.clone();
        }

        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
                Value::from(json)
            }
            Ok(_) | Err(_) => {
                tracing::trace!(len = text.len(), "Text looked like JSON but did not decode");
                value.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::value::Key;

    #[test]
    fn scalars_pass_through() {
        let s = JsonSerializer::new();
        assert_eq!(s.serialize(&Value::Int(42)).unwrap(), Value::Int(42));
        assert_eq!(s.serialize(&Value::Null).unwrap(), Value::Null);
        assert_eq!(s.unserialize(&Value::from("active")), Value::from("active"));
    }

    #[test]
    fn composites_are_stored_as_json_text() {
        let s = JsonSerializer::new();
        let stored = s.serialize(&Value::list([3, 7])).unwrap();
        assert_eq!(stored, Value::from("[3,7]"));
        assert_eq!(s.unserialize(&stored), Value::list([3, 7]));
    }

    #[test]
    fn nested_composites_survive_storage() {
        let s = JsonSerializer::new();
        let nested = Value::map([
            ("name", Value::from("Ada")),
            ("tags", Value::list(["x", "y"])),
        ]);
        let stored = s.serialize(&nested).unwrap();
        let decoded = s.unserialize(&stored);
        assert_eq!(decoded, nested);
        let map = decoded.as_array().unwrap();
        assert_eq!(map.get_index(0).map(|(k, _)| k), Some(&Key::from("name")));
    }

    #[test]
    fn malformed_json_is_returned_unchanged() {
        let s = JsonSerializer::new();
        let broken = Value::from("[1, 2");
        assert_eq!(s.unserialize(&broken), broken);

        let bracket_text = Value::from("{not json}");
        assert_eq!(s.unserialize(&bracket_text), bracket_text);
    }

    #[test]
    fn non_finite_values_are_refused() {
        let s = JsonSerializer::new();
        let err = s.serialize(&Value::list([f64::INFINITY])).unwrap_err();
        assert!(matches!(err, Error::TypeNotAllowed(_)));
    }
}
