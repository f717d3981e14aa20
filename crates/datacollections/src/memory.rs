//! In-process [`DatabaseHelper`] with a query log.
//!
//! [`MemoryDatabase`] keeps tables as ordered lists of raw rows and answers
//! every lookup of the database contract. Each call is recorded in a
//! [`QueryLog`], which makes redundant lazy resolutions visible:
//!
//! ```
//! use datacollections::{MemoryDatabase, QueryOp, raw_row};
//! use datacollections_core::{DatabaseHelper, Value, Window};
//!
//! let db = MemoryDatabase::new().with_table("tl_member", [raw_row([("id", Value::Int(1))])]);
//! let row = db.load_one_by_value(&Value::from("1"), "id", "tl_member", Window::all()).unwrap();
//! assert!(row.is_some());
//! assert_eq!(db.log().count_for(QueryOp::LoadOne, "tl_member"), 1);
//! ```
//!
//! Values are matched loosely, the way a relational source compares a
//! numeric column with a string parameter: `1` matches `"1"`.

use datacollections_core::{
    DatabaseError, DatabaseErrorKind, DatabaseHelper, Error, OrderBy, OrderDirection, RawRow,
    Result, Value, Window,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::cmp::Ordering;

/// Build a raw row from field/value pairs.
pub fn raw_row<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> RawRow
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(field, value)| (field.into(), value.into()))
        .collect()
}

/// Kind of a recorded database call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    LoadOne,
    LoadByValue,
    LoadByList,
    LoadAll,
    Insert,
    Update,
    Delete,
    Save,
}

/// One recorded database call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub op: QueryOp,
    pub table: String,
    /// Field the call matched on, if any
    pub field: Option<String>,
}

/// Records every call made against a [`MemoryDatabase`].
#[derive(Debug, Default)]
pub struct QueryLog {
    records: RefCell<Vec<QueryRecord>>,
}

impl QueryLog {
    fn record(&self, op: QueryOp, table: &str, field: Option<&str>) {
        tracing::trace!(?op, table, field, "Recording query");
        self.records.borrow_mut().push(QueryRecord {
            op,
            table: table.to_string(),
            field: field.map(str::to_string),
        });
    }

    /// A snapshot of all records in call order.
    pub fn records(&self) -> Vec<QueryRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Number of calls of one kind, across all tables.
    pub fn count(&self, op: QueryOp) -> usize {
        self.records.borrow().iter().filter(|r| r.op == op).count()
    }

    /// Number of calls of one kind against one table.
    pub fn count_for(&self, op: QueryOp, table: &str) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.op == op && r.table == table)
            .count()
    }

    /// Number of calls of any kind against one table.
    pub fn count_table(&self, table: &str) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.table == table)
            .count()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

/// A [`DatabaseHelper`] over in-process tables.
///
/// Unknown tables fail with [`DatabaseErrorKind::NotFound`]. New rows
/// without a primary key receive the highest existing id plus one.
#[derive(Debug)]
pub struct MemoryDatabase {
    tables: RefCell<IndexMap<String, Vec<RawRow>>>,
    primary_key: String,
    log: QueryLog,
    failure: RefCell<Option<DatabaseError>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Create a database without tables, keyed by `id`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(IndexMap::new()),
            primary_key: "id".to_string(),
            log: QueryLog::default(),
            failure: RefCell::new(None),
        }
    }

    /// Use another primary-key field for id assignment and updates.
    #[must_use]
    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Create a table with initial rows. Seeding is not logged.
    #[must_use]
    pub fn with_table(self, table: impl Into<String>, rows: impl IntoIterator<Item = RawRow>) -> Self {
        self.tables
            .borrow_mut()
            .insert(table.into(), rows.into_iter().collect());
        self
    }

    /// Append a row to a table, creating the table if needed. Not logged.
    pub fn seed(&self, table: &str, row: RawRow) {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// A snapshot of the rows of a table; empty for unknown tables.
    pub fn rows(&self, table: &str) -> Vec<RawRow> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    /// Make the next call fail with the given error.
    pub fn fail_next(&self, kind: DatabaseErrorKind, message: impl Into<String>) {
        *self.failure.borrow_mut() = Some(DatabaseError::new(kind, None, message));
    }

    fn begin(&self, op: QueryOp, table: &str, field: Option<&str>) -> Result<()> {
        self.log.record(op, table, field);
        match self.failure.borrow_mut().take() {
            Some(mut err) => {
                err.table = Some(table.to_string());
                tracing::debug!(?op, table, message = %err.message, "Injected database failure");
                Err(Error::Database(err))
            }
            None => Ok(()),
        }
    }

    fn id_of(&self, row: &RawRow) -> Option<i64> {
        row.get(&self.primary_key).and_then(Value::as_i64)
    }

    fn select<T>(&self, table: &str, f: impl FnOnce(&[RawRow]) -> T) -> Result<T> {
        let tables = self.tables.borrow();
        let rows = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(f(rows))
    }

    fn insert_row(&self, table: &str, mut row: RawRow) -> Result<i64> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let id = match self.id_of(&row) {
            Some(id) if rows.iter().any(|r| self.id_of(r) == Some(id)) => {
                return Err(Error::Database(DatabaseError::new(
                    DatabaseErrorKind::Constraint,
                    Some(table),
                    format!("duplicate {} {}", self.primary_key, id),
                )));
            }
            Some(id) => id,
            None => rows.iter().filter_map(|r| self.id_of(r)).max().unwrap_or(0) + 1,
        };
        row.insert(self.primary_key.clone(), Value::Int(id));
        rows.push(row);
        Ok(id)
    }

    /// Merge `values` into the row with `id`. Returns whether it existed.
    fn update_row(&self, table: &str, values: &RawRow, id: i64) -> Result<bool> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let Some(row) = rows.iter_mut().find(|r| self.id_of(r) == Some(id)) else {
            return Ok(false);
        };
        for (field, value) in values {
            if *field != self.primary_key {
                row.insert(field.clone(), value.clone());
            }
        }
        Ok(true)
    }
}

fn not_found(table: &str) -> Error {
    Error::Database(DatabaseError::new(
        DatabaseErrorKind::NotFound,
        Some(table),
        format!("no such table: {table}"),
    ))
}

fn matches(row: &RawRow, field: &str, value: &Value) -> bool {
    row.get(field).is_some_and(|v| v.loose_eq(value))
}

fn sort_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) => String::new(),
    }
}

/// NULL sorts first; numbers (and numeric text) numerically; the rest as text.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => sort_text(a).cmp(&sort_text(b)),
        },
    }
}

fn sort_rows(rows: &mut [RawRow], order: &OrderBy) {
    let null = Value::Null;
    rows.sort_by(|a, b| {
        let ordering = compare(
            a.get(order.field()).unwrap_or(&null),
            b.get(order.field()).unwrap_or(&null),
        );
        match order.direction() {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        }
    });
}

impl DatabaseHelper for MemoryDatabase {
    fn load_one_by_value(
        &self,
        value: &Value,
        field: &str,
        table: &str,
        window: Window,
    ) -> Result<Option<RawRow>> {
        self.begin(QueryOp::LoadOne, table, Some(field))?;
        self.select(table, |rows| {
            window
                .apply(rows.iter().filter(|r| matches(r, field, value)))
                .next()
                .cloned()
        })
    }

    fn load_by_value(
        &self,
        value: &Value,
        field: &str,
        table: &str,
        window: Window,
    ) -> Result<Vec<RawRow>> {
        self.begin(QueryOp::LoadByValue, table, Some(field))?;
        self.select(table, |rows| {
            window
                .apply(rows.iter().filter(|r| matches(r, field, value)))
                .cloned()
                .collect()
        })
    }

    fn load_by_list(
        &self,
        values: &[Value],
        table: &str,
        order: &OrderBy,
        window: Window,
        search_field: &str,
    ) -> Result<Vec<RawRow>> {
        self.begin(QueryOp::LoadByList, table, Some(search_field))?;
        let mut found = self.select(table, |rows| {
            rows.iter()
                .filter(|r| values.iter().any(|v| matches(r, search_field, v)))
                .cloned()
                .collect::<Vec<_>>()
        })?;
        sort_rows(&mut found, order);
        Ok(window.apply(found).collect())
    }

    fn load_all(&self, table: &str, order: Option<&OrderBy>, window: Window) -> Result<Vec<RawRow>> {
        self.begin(QueryOp::LoadAll, table, order.map(OrderBy::field))?;
        let mut rows = self.select(table, <[RawRow]>::to_vec)?;
        if let Some(order) = order {
            sort_rows(&mut rows, order);
        }
        Ok(window.apply(rows).collect())
    }

    fn insert(&self, values: &RawRow, table: &str) -> Result<i64> {
        self.begin(QueryOp::Insert, table, None)?;
        let id = self.insert_row(table, values.clone())?;
        tracing::debug!(table, id, "Inserted row");
        Ok(id)
    }

    fn update(&self, values: &RawRow, id: i64, table: &str) -> Result<()> {
        self.begin(QueryOp::Update, table, Some(self.primary_key.as_str()))?;
        if !self.update_row(table, values, id)? {
            tracing::debug!(table, id, "Update matched no row");
        }
        Ok(())
    }

    fn delete(&self, value: &Value, field: &str, table: &str) -> Result<()> {
        self.begin(QueryOp::Delete, table, Some(field))?;
        let mut tables = self.tables.borrow_mut();
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let before = rows.len();
        rows.retain(|r| !matches(r, field, value));
        tracing::debug!(table, deleted = before - rows.len(), "Deleted rows");
        Ok(())
    }

    fn save(&self, table: &str, values: &RawRow) -> Result<i64> {
        self.begin(QueryOp::Save, table, None)?;
        if let Some(id) = self.id_of(values) {
            if self.update_row(table, values, id)? {
                return Ok(id);
            }
        }
        self.insert_row(table, values.clone())
    }
}
