//! The database collaborator contract.
//!
//! Lazy resolution issues its foreign lookups through [`DatabaseHelper`].
//! The trait is deliberately row-oriented: implementations receive plain
//! table/field strings and return raw field-to-value mappings. Query
//! failures are returned as [`Error::Database`](crate::Error::Database) and
//! are passed to the caller unchanged.

use crate::error::Result;
use crate::value::Value;
use indexmap::IndexMap;

/// A raw row as delivered by the data source: field name to scalar value.
pub type RawRow = IndexMap<String, Value>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Get the SQL keyword for this direction.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// ORDER BY specification for list lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    field: String,
    direction: OrderDirection,
}

impl OrderBy {
    /// Order by a field in the given direction.
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create an ascending order by clause.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, OrderDirection::Asc)
    }

    /// Create a descending order by clause.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, OrderDirection::Desc)
    }

    /// The field to order by.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The sort direction.
    pub const fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Generate SQL for this ORDER BY clause.
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.field, self.direction.as_sql())
    }
}

/// OFFSET/LIMIT window of a lookup. A limit of `0` means "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    /// The unbounded window (no offset, no limit).
    pub const fn all() -> Self {
        Self {
            offset: 0,
            limit: 0,
        }
    }

    /// A window with the given offset and limit.
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Check if this window restricts the result in any way.
    pub const fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit == 0
    }

    /// Apply the window to an iterator of rows.
    pub fn apply<T>(self, rows: impl IntoIterator<Item = T>) -> impl Iterator<Item = T> {
        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = match self.limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };
        rows.into_iter().skip(skip).take(take)
    }
}

/// Executes row lookups and writes against a table.
///
/// All calls are blocking; implementations own any retry, timeout or
/// connection handling.
pub trait DatabaseHelper {
    /// Load the first row whose `field` equals `value`.
    fn load_one_by_value(
        &self,
        value: &Value,
        field: &str,
        table: &str,
        window: Window,
    ) -> Result<Option<RawRow>>;

    /// Load all rows whose `field` equals `value`.
    fn load_by_value(
        &self,
        value: &Value,
        field: &str,
        table: &str,
        window: Window,
    ) -> Result<Vec<RawRow>>;

    /// Load all rows whose `search_field` is one of `values`.
    fn load_by_list(
        &self,
        values: &[Value],
        table: &str,
        order: &OrderBy,
        window: Window,
        search_field: &str,
    ) -> Result<Vec<RawRow>>;

    /// Load every row of a table, optionally ordered.
    fn load_all(&self, table: &str, order: Option<&OrderBy>, window: Window)
    -> Result<Vec<RawRow>>;

    /// Insert a row and return its new identifier.
    fn insert(&self, values: &RawRow, table: &str) -> Result<i64>;

    /// Update the row with the given identifier.
    fn update(&self, values: &RawRow, id: i64, table: &str) -> Result<()>;

    /// Delete all rows whose `field` equals `value`.
    fn delete(&self, value: &Value, field: &str, table: &str) -> Result<()>;

    /// Insert or update a row depending on whether it carries a known
    /// identifier; returns the row identifier.
    fn save(&self, table: &str, values: &RawRow) -> Result<i64>;
}
