//! Typed facade over the database collaborator.

use crate::collection::ToRawRow;
use crate::factory::CollectionFactory;
use crate::multi::MultiRowCollection;
use crate::row::DatabaseRowCollection;
use datacollections_core::{
    FieldIdent, FieldName, OrderBy, OrderDirection, RawRow, Result, TableIdent, TableName, Value,
    Window,
};

/// Runs lookups and writes with validated names and returns collections
/// instead of raw rows.
///
/// Empty results are `None`. Writes accept raw rows as well as any
/// collection.
#[derive(Debug, Clone)]
pub struct CollectionDatabaseHelper {
    factory: CollectionFactory,
}

impl CollectionDatabaseHelper {
    pub fn new(factory: CollectionFactory) -> Self {
        Self { factory }
    }

    fn wrap(&self, table: &TableName, rows: Vec<RawRow>) -> Option<MultiRowCollection> {
        if rows.is_empty() {
            None
        } else {
            Some(self.factory.multi_from_rows(table, rows))
        }
    }

    #[tracing::instrument(level = "debug", skip(self, value, field, table))]
    pub fn load_one_by_value(
        &self,
        value: impl Into<Value>,
        field: impl FieldIdent,
        table: impl TableIdent,
        window: Window,
    ) -> Result<Option<DatabaseRowCollection>> {
        let (field, table) = (field.field_name()?, table.table_name()?);
        let row = self.factory.database().load_one_by_value(
            &value.into(),
            field.as_str(),
            table.as_str(),
            window,
        )?;
        Ok(row.map(|row| DatabaseRowCollection::new(self.factory.clone(), table, row)))
    }

    #[tracing::instrument(level = "debug", skip(self, value, field, table))]
    pub fn load_by_value(
        &self,
        value: impl Into<Value>,
        field: impl FieldIdent,
        table: impl TableIdent,
        window: Window,
    ) -> Result<Option<MultiRowCollection>> {
        let (field, table) = (field.field_name()?, table.table_name()?);
        let rows = self.factory.database().load_by_value(
            &value.into(),
            field.as_str(),
            table.as_str(),
            window,
        )?;
        Ok(self.wrap(&table, rows))
    }

    /// Load the rows whose `search_field` (default: the primary key) is one
    /// of `values`, ordered by `order_field`.
    #[tracing::instrument(level = "debug", skip(self, values, order_field, table, search_field))]
    pub fn load_by_list(
        &self,
        values: &[Value],
        order_field: impl FieldIdent,
        table: impl TableIdent,
        direction: OrderDirection,
        window: Window,
        search_field: Option<&FieldName>,
    ) -> Result<Option<MultiRowCollection>> {
        let (order_field, table) = (order_field.field_name()?, table.table_name()?);
        let search_field = search_field.unwrap_or(self.factory.primary_key());
        let rows = self.factory.database().load_by_list(
            values,
            table.as_str(),
            &OrderBy::new(order_field.as_str(), direction),
            window,
            search_field.as_str(),
        )?;
        Ok(self.wrap(&table, rows))
    }

    #[tracing::instrument(level = "debug", skip(self, table, order_field))]
    pub fn load_all(
        &self,
        table: impl TableIdent,
        order_field: Option<&FieldName>,
        direction: OrderDirection,
        window: Window,
    ) -> Result<Option<MultiRowCollection>> {
        let table = table.table_name()?;
        let order = order_field.map(|field| OrderBy::new(field.as_str(), direction));
        let rows = self
            .factory
            .database()
            .load_all(table.as_str(), order.as_ref(), window)?;
        Ok(self.wrap(&table, rows))
    }

    #[tracing::instrument(level = "debug", skip(self, values, table))]
    pub fn insert(&self, values: &impl ToRawRow, table: impl TableIdent) -> Result<i64> {
        let table = table.table_name()?;
        self.factory
            .database()
            .insert(&values.to_raw_row()?, table.as_str())
    }

    #[tracing::instrument(level = "debug", skip(self, values, table))]
    pub fn update(&self, values: &impl ToRawRow, id: i64, table: impl TableIdent) -> Result<()> {
        let table = table.table_name()?;
        self.factory
            .database()
            .update(&values.to_raw_row()?, id, table.as_str())
    }

    #[tracing::instrument(level = "debug", skip(self, value, field, table))]
    pub fn delete(
        &self,
        value: impl Into<Value>,
        field: impl FieldIdent,
        table: impl TableIdent,
    ) -> Result<()> {
        let (field, table) = (field.field_name()?, table.table_name()?);
        self.factory
            .database()
            .delete(&value.into(), field.as_str(), table.as_str())
    }

    #[tracing::instrument(level = "debug", skip(self, table, values))]
    pub fn save(&self, table: impl TableIdent, values: &impl ToRawRow) -> Result<i64> {
        let table = table.table_name()?;
        self.factory
            .database()
            .save(table.as_str(), &values.to_raw_row()?)
    }
}
