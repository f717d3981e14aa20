//! Declarative field metadata ("DCA").
//!
//! The framework describes every table as a nested configuration document.
//! Only two parts of it matter to lazy loading:
//!
//! ```json
//! {
//!   "tl_news": {
//!     "fields": {
//!       "author": { "lazyloading": { "table": "tl_member", "field": "id" } },
//!       "tags":   { "lazyloading": { "table": "tl_tag", "field": "id", "serialised": "1" } }
//!     },
//!     "config": { "lazyloading": { "tl_comments": "pid" } }
//!   }
//! }
//! ```
//!
//! [`DcaRegistry`] decodes that shape once into typed structs; any other keys
//! in the document are ignored. The registry is the default
//! [`MetadataProvider`].

use datacollections_core::{ConfigError, Error, FieldName, Result, TableName};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Source of per-table/per-field lazy-load configuration.
///
/// Missing configuration at any level is answered with `None`.
pub trait MetadataProvider: fmt::Debug {
    /// The lazy-load descriptor of `table.field`, if one is declared and non-empty.
    fn dependencies(&self, table: &TableName, field: &FieldName) -> Option<LazyDescriptor>;

    /// The field in `child` that holds the parent id of a `table` row.
    fn child_dependencies(&self, table: &TableName, child: &TableName) -> Option<String>;
}

/// The decoded `lazyloading` entry of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazyDescriptor {
    /// Foreign table the stored value points into
    #[serde(default, deserialize_with = "non_empty_string")]
    pub table: Option<String>,
    /// Field in the foreign table the stored value is matched against
    #[serde(default, deserialize_with = "non_empty_string")]
    pub field: Option<String>,
    /// Whether the stored value is an encoded list of foreign keys
    #[serde(default, deserialize_with = "loose_bool")]
    pub serialised: bool,
}

impl LazyDescriptor {
    /// A descriptor pointing at `table.field`.
    pub fn new(table: impl Into<String>, field: impl Into<String>, serialised: bool) -> Self {
        Self {
            table: Some(table.into()).filter(|t| !t.is_empty()),
            field: Some(field.into()).filter(|f| !f.is_empty()),
            serialised,
        }
    }

    /// A descriptor that declares nothing.
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.field.is_none() && !self.serialised
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Accept the untyped flag forms the metadata source stores:
/// `true`, `1`, `"1"` and `"true"` are true, everything else is false.
fn loose_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n.abs() > f64::EPSILON),
        serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Field entry of a table configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDca {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazyloading: Option<LazyDescriptor>,
}

/// Table-level `config` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Child table name to the child field holding the parent id
    #[serde(default)]
    pub lazyloading: HashMap<String, String>,
}

/// Configuration of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDca {
    #[serde(default)]
    pub fields: HashMap<String, FieldDca>,
    #[serde(default)]
    pub config: TableConfig,
}

/// Typed lazy-load metadata for a set of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DcaRegistry {
    tables: HashMap<String, TableDca>,
}

impl DcaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a registry from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(config_error)
    }

    /// Decode a registry from a reader producing a JSON document.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        serde_json::from_reader(reader).map_err(config_error)
    }

    /// Read and decode a registry from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("cannot open metadata file {}", path.display()),
                source: Some(Box::new(e)),
            })
        })?;
        tracing::debug!(path = %path.display(), "Loading lazy-load metadata");
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Declare a lazy-load descriptor for `table.field`.
    #[must_use]
    pub fn with_field_dependency(
        mut self,
        table: &TableName,
        field: &FieldName,
        descriptor: LazyDescriptor,
    ) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .fields
            .insert(
                field.to_string(),
                FieldDca {
                    lazyloading: Some(descriptor),
                },
            );
        self
    }

    /// Declare that `child.child_field` holds the id of the parent `table` row.
    #[must_use]
    pub fn with_child_dependency(
        mut self,
        table: &TableName,
        child: &TableName,
        child_field: &FieldName,
    ) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .config
            .lazyloading
            .insert(child.to_string(), child_field.to_string());
        self
    }

    /// Configuration of a table, if declared.
    pub fn table(&self, table: &TableName) -> Option<&TableDca> {
        self.tables.get(table.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn config_error(e: serde_json::Error) -> Error {
    Error::Config(ConfigError {
        message: format!("invalid lazy-load metadata: {e}"),
        source: Some(Box::new(e)),
    })
}

impl MetadataProvider for DcaRegistry {
    fn dependencies(&self, table: &TableName, field: &FieldName) -> Option<LazyDescriptor> {
        self.table(table)?
            .fields
            .get(field.as_str())?
            .lazyloading
            .as_ref()
            .filter(|d| !d.is_empty())
            .cloned()
    }

    fn child_dependencies(&self, table: &TableName, child: &TableName) -> Option<String> {
        self.table(table)?
            .config
            .lazyloading
            .get(child.as_str())
            .filter(|f| !f.is_empty())
            .cloned()
    }
}
