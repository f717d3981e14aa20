//! Values returned by collection reads.

use crate::collection::ArrayCollection;
use crate::multi::RowsRef;
use crate::row::RowRef;
use datacollections_core::{Error, Result, Value};
use std::fmt;
use std::rc::Rc;

/// The result of reading a key from a collection or a field from a row.
///
/// Plain collections only ever produce `Null`, `Scalar` and `Collection`.
/// Rows additionally produce `Row` and `Rows` for lazily resolved foreign
/// data; those are shared handles, so repeated reads of a cached field
/// return the same instance (see [`FieldValue::same_as`]).
#[derive(Clone)]
pub enum FieldValue {
    /// Missing key, stored NULL, or a lazy field that resolved to nothing
    Null,
    /// A stored scalar
    Scalar(Value),
    /// A decoded composite, wrapped into a fresh collection
    Collection(ArrayCollection),
    /// A single foreign row
    Row(RowRef),
    /// Several foreign rows
    Rows(RowsRef),
}

impl FieldValue {
    /// Check if this is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get the scalar, if this is one.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Get the collection, if this is one.
    pub fn as_collection(&self) -> Option<&ArrayCollection> {
        match self {
            FieldValue::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Get the foreign row handle, if this is one.
    pub fn as_row(&self) -> Option<&RowRef> {
        match self {
            FieldValue::Row(r) => Some(r),
            _ => None,
        }
    }

    /// Get the foreign rows handle, if this is one.
    pub fn as_rows(&self) -> Option<&RowsRef> {
        match self {
            FieldValue::Rows(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, for logs and error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Scalar(_) => "scalar",
            FieldValue::Collection(_) => "collection",
            FieldValue::Row(_) => "row",
            FieldValue::Rows(_) => "rows",
        }
    }

    /// Identity check: row handles must point to the same instance, all other
    /// variants compare by content.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Row(a), FieldValue::Row(b)) => Rc::ptr_eq(a, b),
            (FieldValue::Rows(a), FieldValue::Rows(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Convert into a plain value for storage.
    ///
    /// Row handles have no storage form and yield `TypeNotAllowed`.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Scalar(v) => Ok(v.clone()),
            FieldValue::Collection(c) => Ok(c.to_value()),
            FieldValue::Row(_) | FieldValue::Rows(_) => Err(Error::type_not_allowed(
                None,
                format!("{} handle", self.kind()),
                "resolved rows have no storage form, write their id instead",
            )),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Scalar(a), FieldValue::Scalar(b)) => a == b,
            (FieldValue::Collection(a), FieldValue::Collection(b)) => a == b,
            (FieldValue::Row(a), FieldValue::Row(b)) => Rc::ptr_eq(a, b),
            (FieldValue::Rows(a), FieldValue::Rows(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl TryFrom<FieldValue> for Value {
    type Error = Error;

    fn try_from(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Scalar(v) => Ok(v),
            other => other.to_value(),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "Null"),
            FieldValue::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            FieldValue::Collection(c) => f.debug_tuple("Collection").field(c).finish(),
            FieldValue::Row(r) => match r.try_borrow() {
                Ok(row) => f
                    .debug_struct("Row")
                    .field("table", row.table())
                    .field("id", &row.id())
                    .finish(),
                Err(_) => write!(f, "Row(<borrowed>)"),
            },
            FieldValue::Rows(rows) => f
                .debug_struct("Rows")
                .field("table", rows.table())
                .field("len", &rows.len())
                .finish(),
        }
    }
}
