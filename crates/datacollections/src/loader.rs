//! Foreign row lookups.

use crate::factory::CollectionFactory;
use crate::multi::RowsRef;
use crate::row::RowRef;
use datacollections_core::{FieldName, OrderBy, RawRow, Result, TableName, Value, Window};
use std::rc::Rc;

/// Issues foreign lookups through the database collaborator and wraps the
/// resulting rows.
///
/// Database failures are returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RowLoader<'f> {
    factory: &'f CollectionFactory,
}

impl<'f> RowLoader<'f> {
    pub fn new(factory: &'f CollectionFactory) -> Self {
        Self { factory }
    }

    /// Load the single row of `table` whose `field` equals `value`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load_one(
        &self,
        table: &TableName,
        field: &FieldName,
        value: &Value,
    ) -> Result<Option<RowRef>> {
        let row = self.factory.database().load_one_by_value(
            value,
            field.as_str(),
            table.as_str(),
            Window::all(),
        )?;
        tracing::debug!(found = row.is_some(), "Single-row lookup finished");
        Ok(row.map(|row| self.factory.row_ref(table, row)))
    }

    /// Load all rows of `table` whose `field` is one of the values encoded in
    /// `value`.
    ///
    /// A stored value that does not decode to a list, or decodes to an empty
    /// one, is "no data" and issues no query.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load_multiple(
        &self,
        table: &TableName,
        field: &FieldName,
        value: &Value,
    ) -> Result<Option<RowsRef>> {
        let Value::Array(list) = self.factory.serializer().unserialize(value) else {
            tracing::debug!("Serialised field does not hold a list");
            return Ok(None);
        };
        if list.is_empty() {
            return Ok(None);
        }

        let values: Vec<Value> = list.into_values().collect();
        let order = OrderBy::new(field.as_str(), self.factory.list_order());
        let rows = self.factory.database().load_by_list(
            &values,
            table.as_str(),
            &order,
            Window::all(),
            field.as_str(),
        )?;
        tracing::debug!(requested = values.len(), found = rows.len(), "List lookup finished");
        Ok(self.wrap(table, rows))
    }

    /// Load all rows of `table` whose `field` equals `parent_id`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load_multiple_by_id(
        &self,
        table: &TableName,
        field: &FieldName,
        parent_id: &Value,
    ) -> Result<Option<RowsRef>> {
        let rows = self.factory.database().load_by_value(
            parent_id,
            field.as_str(),
            table.as_str(),
            Window::all(),
        )?;
        tracing::debug!(found = rows.len(), "Child lookup finished");
        Ok(self.wrap(table, rows))
    }

    fn wrap(&self, table: &TableName, rows: Vec<RawRow>) -> Option<RowsRef> {
        if rows.is_empty() {
            return None;
        }
        Some(Rc::new(self.factory.multi_from_rows(table, rows)))
    }
}
