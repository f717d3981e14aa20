//! Validated table and field identifiers.
//!
//! [`TableName`] and [`FieldName`] are string wrappers that only hold
//! identifiers made of `[A-Za-z0-9_]`, not starting with a digit and at most
//! [`MAX_IDENTIFIER_LEN`] characters long. Equality is by value.
//!
//! APIs that address a table or a field accept anything implementing
//! [`TableIdent`] / [`FieldIdent`]: a validated name, a plain string, or an
//! application enum listing the known tables of a schema:
//!
//! ```
//! use datacollections_core::{FieldIdent, FieldName, Result};
//!
//! enum NewsField {
//!     Author,
//!     Tags,
//! }
//!
//! impl FieldIdent for NewsField {
//!     fn field_name(&self) -> Result<FieldName> {
//!         FieldName::new(match self {
//!             NewsField::Author => "author",
//!             NewsField::Tags => "tags",
//!         })
//!     }
//! }
//!
//! assert_eq!(NewsField::Tags.field_name().unwrap().as_str(), "tags");
//! assert_eq!("author".field_name().unwrap(), NewsField::Author.field_name().unwrap());
//! ```

use crate::error::{Error, NameError, NameErrorKind, Result};
use crate::value::Key;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Maximum identifier length accepted by the name wrappers.
pub const MAX_IDENTIFIER_LEN: usize = 64;

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

fn validate(name: &str) -> Result<()> {
    let kind = if name.is_empty() {
        NameErrorKind::Empty
    } else if name.chars().count() > MAX_IDENTIFIER_LEN {
        NameErrorKind::TooLong
    } else if !IDENTIFIER.is_match(name) {
        NameErrorKind::InvalidCharacters
    } else {
        return Ok(());
    };
    Err(Error::Name(NameError {
        kind,
        name: name.to_string(),
    }))
}

/// A validated table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    /// Validate and wrap a table name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Get the table name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated field (column) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldName(String);

impl FieldName {
    /// Validate and wrap a field name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Get the field name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection key this field is stored under.
    pub fn key(&self) -> Key {
        Key::Str(self.0.clone())
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&FieldName> for Key {
    fn from(name: &FieldName) -> Self {
        name.key()
    }
}

/// Anything that names a table.
pub trait TableIdent {
    /// Resolve to a validated table name.
    fn table_name(&self) -> Result<TableName>;
}

/// Anything that names a field.
pub trait FieldIdent {
    /// Resolve to a validated field name.
    fn field_name(&self) -> Result<FieldName>;
}

impl TableIdent for TableName {
    fn table_name(&self) -> Result<TableName> {
        Ok(self.clone())
    }
}

impl TableIdent for str {
    fn table_name(&self) -> Result<TableName> {
        TableName::new(self)
    }
}

impl TableIdent for String {
    fn table_name(&self) -> Result<TableName> {
        TableName::new(self.as_str())
    }
}

impl<T: TableIdent + ?Sized> TableIdent for &T {
    fn table_name(&self) -> Result<TableName> {
        (**self).table_name()
    }
}

impl FieldIdent for FieldName {
    fn field_name(&self) -> Result<FieldName> {
        Ok(self.clone())
    }
}

impl FieldIdent for str {
    fn field_name(&self) -> Result<FieldName> {
        FieldName::new(self)
    }
}

impl FieldIdent for String {
    fn field_name(&self) -> Result<FieldName> {
        FieldName::new(self.as_str())
    }
}

impl<T: FieldIdent + ?Sized> FieldIdent for &T {
    fn field_name(&self) -> Result<FieldName> {
        (**self).field_name()
    }
}
