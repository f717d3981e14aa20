//! Collections of rows from one table.

use crate::collection::ArrayCollection;
use crate::row::RowRef;
use datacollections_core::{FieldIdent, Key, Result, Serializer, TableName};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use std::slice;

/// Shared handle to a resolved set of foreign rows.
pub type RowsRef = Rc<MultiRowCollection>;

/// Rows of one table, indexed by result position.
///
/// Elements are shared row handles, so reading a lazy field through a row
/// of this collection caches it for every holder of the handle.
pub struct MultiRowCollection {
    table: TableName,
    rows: Vec<RowRef>,
    serializer: Rc<dyn Serializer>,
}

impl MultiRowCollection {
    pub fn new(table: TableName, rows: Vec<RowRef>, serializer: Rc<dyn Serializer>) -> Self {
        Self {
            table,
            rows,
            serializer,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row at result position `index`.
    pub fn get(&self, index: usize) -> Option<RowRef> {
        self.rows.get(index).cloned()
    }

    pub fn iter(&self) -> slice::Iter<'_, RowRef> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[RowRef] {
        &self.rows
    }

    /// The stored values of `field` across all rows, keyed `0..n`.
    ///
    /// Rows lacking the field are skipped. Values are read as stored, without
    /// lazy resolution.
    pub fn column(&self, field: impl FieldIdent) -> Result<ArrayCollection> {
        let field = field.field_name()?;
        let mut values = IndexMap::new();
        for row in &self.rows {
            if let Some(value) = row.borrow().raw_value(&field) {
                values.insert(Key::from(values.len()), value.clone());
            }
        }
        Ok(ArrayCollection::new(Rc::clone(&self.serializer), values))
    }

    /// The ids of all rows that have one.
    pub fn ids(&self) -> Vec<Key> {
        self.rows.iter().filter_map(|row| row.borrow().id()).collect()
    }
}

impl<'a> IntoIterator for &'a MultiRowCollection {
    type Item = &'a RowRef;
    type IntoIter = slice::Iter<'a, RowRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for MultiRowCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiRowCollection")
            .field("table", &self.table)
            .field("rows", &self.rows)
            .finish()
    }
}
