//! The generic key-value collection.
//!
//! An [`ArrayCollection`] is an ordered mapping from [`Key`] to [`Value`].
//! Every write goes through the configured [`Serializer`], so the collection
//! only ever holds values in their storage form. Every read decodes again
//! and wraps composites into a new collection:
//!
//! ```
//! use datacollections::{ArrayCollection, FieldValue};
//! use datacollections_core::{JsonSerializer, Value};
//! use std::rc::Rc;
//!
//! let mut tags = ArrayCollection::empty(Rc::new(JsonSerializer::new()));
//! tags.set_value("ids", Value::list([3, 7])).unwrap();
//!
//! let FieldValue::Collection(ids) = tags.get_value("ids") else {
//!     panic!("composite values come back as collections");
//! };
//! assert_eq!(ids.len(), 2);
//! ```

use crate::field_value::FieldValue;
use crate::iter::CollectionIter;
use datacollections_core::{Error, Key, RawRow, Result, Serializer, Value};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Produces the flat raw-row form of a collection for persistence.
pub trait ToRawRow {
    /// Encode into a field-to-storage-value mapping.
    fn to_raw_row(&self) -> Result<RawRow>;
}

impl ToRawRow for RawRow {
    fn to_raw_row(&self) -> Result<RawRow> {
        Ok(self.clone())
    }
}

/// An ordered, serialize-on-write key-value collection.
#[derive(Clone)]
pub struct ArrayCollection {
    elements: IndexMap<Key, Value>,
    serializer: Rc<dyn Serializer>,
}

impl ArrayCollection {
    /// Create a collection over an initial backing map.
    ///
    /// The elements are taken as given; composites held here are encoded
    /// lazily when the collection is turned into a raw row.
    pub fn new(serializer: Rc<dyn Serializer>, elements: IndexMap<Key, Value>) -> Self {
        Self {
            elements,
            serializer,
        }
    }

    /// Create an empty collection.
    pub fn empty(serializer: Rc<dyn Serializer>) -> Self {
        Self::new(serializer, IndexMap::new())
    }

    /// Create a collection from a raw database row.
    pub fn from_raw_row(serializer: Rc<dyn Serializer>, row: RawRow) -> Self {
        let elements = row
            .into_iter()
            .map(|(field, value)| (Key::from(field), value))
            .collect();
        Self::new(serializer, elements)
    }

    /// Read the value at `key`.
    ///
    /// Missing keys and stored NULL read as [`FieldValue::Null`]. A stored
    /// value that decodes to a composite is returned as a fresh collection.
    pub fn get_value(&self, key: impl Into<Key>) -> FieldValue {
        decode(&self.serializer, self.elements.get(&key.into()))
    }

    /// Encode `value` into its storage form and store it under `key`.
    ///
    /// Nothing is written if encoding fails.
    pub fn set_value(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let stored = self
            .serializer
            .serialize(&value.into())
            .map_err(|e| e.with_field(&key.to_string()))?;
        self.elements.insert(key, stored);
        Ok(())
    }

    /// Check if `key` is present.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.elements.contains_key(&key.into())
    }

    /// Remove `key`, keeping the order of the remaining elements.
    ///
    /// Returns whether the key was present.
    pub fn remove(&mut self, key: impl Into<Key>) -> bool {
        self.elements.shift_remove(&key.into()).is_some()
    }

    /// Raw read access is not part of the public contract.
    ///
    /// Always fails with `MethodNotAllowed`; use [`get_value`](Self::get_value).
    pub fn get(&self, _key: impl Into<Key>) -> Result<FieldValue> {
        Err(Error::method_not_allowed("get", "get_value"))
    }

    /// Raw write access is not part of the public contract.
    ///
    /// Always fails with `MethodNotAllowed`; use [`set_value`](Self::set_value).
    pub fn set(&mut self, _key: impl Into<Key>, _value: impl Into<Value>) -> Result<()> {
        Err(Error::method_not_allowed("set", "set_value"))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.elements.keys()
    }

    /// Iterate over the elements, decoding each value like [`get_value`](Self::get_value).
    pub fn iter(&self) -> CollectionIter<'_> {
        CollectionIter::new(self.elements.iter(), &self.serializer)
    }

    /// Project `name` out of every composite element.
    ///
    /// Elements that are not composites, or that lack `name`, are skipped.
    /// The result is a list keyed `0..n`.
    pub fn column(&self, name: impl Into<Key>) -> ArrayCollection {
        let name = name.into();
        let mut projected = IndexMap::new();
        for raw in self.elements.values() {
            if let Value::Array(element) = self.serializer.unserialize(raw) {
                if let Some(value) = element.get(&name) {
                    projected.insert(Key::from(projected.len()), value.clone());
                }
            }
        }
        ArrayCollection::new(Rc::clone(&self.serializer), projected)
    }

    /// The fully decoded content as a single composite value.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.elements
                .iter()
                .map(|(key, raw)| (key.clone(), self.decoded(raw)))
                .collect(),
        )
    }

    /// The serializer this collection encodes with.
    pub fn serializer(&self) -> &Rc<dyn Serializer> {
        &self.serializer
    }

    fn decoded(&self, raw: &Value) -> Value {
        match decode(&self.serializer, Some(raw)) {
            FieldValue::Collection(nested) => nested.to_value(),
            FieldValue::Scalar(value) => value,
            _ => Value::Null,
        }
    }

    pub(crate) fn raw_get(&self, key: &Key) -> Option<&Value> {
        self.elements.get(key)
    }

    pub(crate) fn raw_set(&mut self, key: Key, value: Value) {
        self.elements.insert(key, value);
    }
}

impl ToRawRow for ArrayCollection {
    fn to_raw_row(&self) -> Result<RawRow> {
        self.elements
            .iter()
            .map(|(key, value)| {
                let field = key.to_string();
                let stored = self
                    .serializer
                    .serialize(value)
                    .map_err(|e| e.with_field(&field))?;
                Ok((field, stored))
            })
            .collect()
    }
}

/// Decode a stored value the way every collection read does.
pub(crate) fn decode(serializer: &Rc<dyn Serializer>, raw: Option<&Value>) -> FieldValue {
    match raw {
        None | Some(Value::Null) => FieldValue::Null,
        Some(raw) => match serializer.unserialize(raw) {
            Value::Array(elements) => {
                FieldValue::Collection(ArrayCollection::new(Rc::clone(serializer), elements))
            }
            Value::Null => FieldValue::Null,
            decoded => FieldValue::Scalar(decoded),
        },
    }
}

impl PartialEq for ArrayCollection {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl fmt::Debug for ArrayCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.elements.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a ArrayCollection {
    type Item = (&'a Key, FieldValue);
    type IntoIter = CollectionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datacollections_core::JsonSerializer;

    fn collection() -> ArrayCollection {
        ArrayCollection::empty(Rc::new(JsonSerializer::new()))
    }

    #[test]
    fn scalars_read_back_unchanged() {
        let mut c = collection();
        c.set_value("status", "active").unwrap();
        c.set_value(0, 42).unwrap();
        assert_eq!(c.get_value("status"), FieldValue::Scalar(Value::from("active")));
        assert_eq!(c.get_value(0), FieldValue::Scalar(Value::Int(42)));
        assert!(c.get_value("missing").is_null());
    }

    #[test]
    fn composites_are_stored_encoded() {
        let mut c = collection();
        c.set_value("tags", Value::list(["a", "b"])).unwrap();
        assert_eq!(c.raw_get(&Key::from("tags")), Some(&Value::from(r#"["a","b"]"#)));

        let tags = c.get_value("tags");
        let tags = tags.as_collection().unwrap();
        assert_eq!(tags.get_value(1), FieldValue::Scalar(Value::from("b")));
    }

    #[test]
    fn every_read_yields_a_fresh_collection() {
        let mut c = collection();
        c.set_value("tags", Value::list([1])).unwrap();
        let FieldValue::Collection(mut first) = c.get_value("tags") else {
            panic!("expected collection");
        };
        first.set_value(1, 2).unwrap();
        let second = c.get_value("tags");
        assert_eq!(second.as_collection().unwrap().len(), 1);
    }

    #[test]
    fn raw_accessors_are_refused() {
        let mut c = collection();
        let err = c.get("x").unwrap_err();
        assert!(err.is_contract_violation());
        assert!(matches!(c.set("x", 1), Err(Error::MethodNotAllowed(_))));
        assert!(c.is_empty());
    }

    #[test]
    fn remove_keeps_order() {
        let mut c = collection();
        c.set_value("a", 1).unwrap();
        c.set_value("b", 2).unwrap();
        c.set_value("c", 3).unwrap();
        assert!(c.remove("b"));
        assert!(!c.remove("b"));
        assert!(!c.contains("b"));
        let keys: Vec<String> = c.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn column_projects_nested_key() {
        let mut rows = collection();
        rows.set_value(0, Value::map([("id", 1), ("name", 10)])).unwrap();
        rows.set_value(1, Value::map([("name", 20)])).unwrap();
        rows.set_value(2, Value::map([("id", 3)])).unwrap();
        rows.set_value(3, "scalar").unwrap();

        let ids = rows.column("id");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get_value(0), FieldValue::Scalar(Value::Int(1)));
        assert_eq!(ids.get_value(1), FieldValue::Scalar(Value::Int(3)));
    }

    #[test]
    fn equality_is_structural() {
        let mut a = collection();
        a.set_value("tags", Value::list([1, 2])).unwrap();
        let b = ArrayCollection::new(
            Rc::new(JsonSerializer::new()),
            IndexMap::from([(Key::from("tags"), Value::list([1, 2]))]),
        );
        assert_eq!(a, b);
        assert_eq!(a.to_value(), Value::map([("tags", Value::list([1, 2]))]));
    }

    #[test]
    fn raw_row_encodes_composites() {
        let c = ArrayCollection::new(
            Rc::new(JsonSerializer::new()),
            IndexMap::from([
                (Key::from("id"), Value::Int(5)),
                (Key::from("tags"), Value::list([3, 7])),
            ]),
        );
        let row = c.to_raw_row().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(5)));
        assert_eq!(row.get("tags"), Some(&Value::from("[3,7]")));
    }

    #[test]
    fn failed_write_leaves_collection_untouched() {
        let mut c = collection();
        c.set_value("score", 1).unwrap();
        let err = c.set_value("score", Value::list([f64::NAN])).unwrap_err();
        match err {
            Error::TypeNotAllowed(e) => assert_eq!(e.field.as_deref(), Some("score")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(c.get_value("score"), FieldValue::Scalar(Value::Int(1)));
    }
}
