//! The database row collection.
//!
//! A [`DatabaseRowCollection`] is one row of a table. Reading a field whose
//! metadata declares a lazy-load relation resolves the stored foreign key on
//! first access and memoizes the outcome in the row's own [`LazyCache`]:
//!
//! 1. cache hit: return the cached value, "nothing found" included
//! 2. read the stored value
//! 3. NULL, composites and fields without a relation are returned as stored
//! 4. otherwise resolve, cache and return the foreign row(s)
//!
//! Writing a field drops its cache entry before the new value is stored.
//! Writing the primary key drops the whole cache, since every cache key
//! embeds the row id. Rows without id are keyed by a process-unique
//! instance number instead.

use crate::cache::{LazyCache, LazyKey, RowIdentity};
use crate::collection::{ArrayCollection, ToRawRow};
use crate::factory::CollectionFactory;
use crate::field_value::FieldValue;
use crate::multi::RowsRef;
use datacollections_core::{
    Error, FieldIdent, FieldName, Key, RawRow, Result, TableIdent, TableName, Value,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a resolved foreign row.
pub type RowRef = Rc<RefCell<DatabaseRowCollection>>;

/// One table row with lazy foreign-key resolution.
pub struct DatabaseRowCollection {
    factory: CollectionFactory,
    table: TableName,
    instance: u64,
    elements: ArrayCollection,
    lazy: LazyCache,
    common: ArrayCollection,
    children: HashMap<TableName, Option<RowsRef>>,
}

impl DatabaseRowCollection {
    pub(crate) fn new(factory: CollectionFactory, table: TableName, row: RawRow) -> Self {
        let serializer = Rc::clone(factory.serializer());
        Self {
            elements: ArrayCollection::from_raw_row(Rc::clone(&serializer), row),
            common: ArrayCollection::empty(serializer),
            lazy: factory.new_lazy_cache(),
            children: HashMap::new(),
            factory,
            table,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// The value of the primary-key field, if set.
    pub fn id(&self) -> Option<Key> {
        self.elements
            .raw_get(&self.factory.primary_key().key())
            .and_then(Key::from_value)
    }

    /// The identity lazy values of this row are cached under.
    pub fn identity(&self) -> RowIdentity {
        match self.id() {
            Some(id) => RowIdentity::Id(id),
            None => RowIdentity::Instance(self.instance),
        }
    }

    fn lazy_key(&self, field: &FieldName) -> LazyKey {
        LazyKey::new(self.table.clone(), field.clone(), self.identity())
    }

    /// Read a field, resolving lazy-load relations on first access.
    pub fn get_value(&mut self, field: impl FieldIdent) -> Result<FieldValue> {
        let field = field.field_name()?;
        let key = self.lazy_key(&field);
        if let Some(cached) = self.lazy.lookup(&key) {
            return Ok(cached);
        }

        let lazy_loader = self.factory.lazy_loader();
        match self.elements.raw_get(&field.key()) {
            Some(raw) if lazy_loader.is_resolvable(&self.table, &field, raw) => {
                let resolved = lazy_loader.load_data(&self.table, &field, raw)?;
                self.lazy.store(key, resolved.clone());
                Ok(resolved)
            }
            _ => Ok(self.elements.get_value(field.key())),
        }
    }

    /// Encode `value` and store it in `field`, invalidating its lazy value.
    ///
    /// Nothing changes if the value cannot be encoded.
    pub fn set_value(&mut self, field: impl FieldIdent, value: impl Into<Value>) -> Result<()> {
        let field = field.field_name()?;
        let stored = self
            .factory
            .serializer()
            .serialize(&value.into())
            .map_err(|e| e.with_field(field.as_str()))?;
        self.store_field(&field, stored);
        Ok(())
    }

    /// Store a value previously read from a collection.
    ///
    /// Resolved row handles have no storage form and are refused with
    /// `TypeNotAllowed`.
    pub fn set_field_value(&mut self, field: impl FieldIdent, value: FieldValue) -> Result<()> {
        let field = field.field_name()?;
        let value = value.to_value().map_err(|e| e.with_field(field.as_str()))?;
        self.set_value(field, value)
    }

    fn store_field(&mut self, field: &FieldName, stored: Value) {
        if field == self.factory.primary_key() {
            self.lazy.reset();
            self.children.clear();
        } else {
            let key = self.lazy_key(field);
            self.lazy.invalidate(&key);
        }
        self.elements.raw_set(field.key(), stored);
    }

    /// Check if the field is present.
    pub fn contains(&self, field: impl FieldIdent) -> Result<bool> {
        Ok(self.elements.contains(field.field_name()?.key()))
    }

    /// Remove a field and its lazy value. Returns whether it was present.
    pub fn remove(&mut self, field: impl FieldIdent) -> Result<bool> {
        let field = field.field_name()?;
        if field == *self.factory.primary_key() {
            self.lazy.reset();
            self.children.clear();
        } else {
            let key = self.lazy_key(&field);
            self.lazy.invalidate(&key);
        }
        Ok(self.elements.remove(field.key()))
    }

    /// Raw read access is not part of the public contract.
    pub fn get(&self, _field: impl FieldIdent) -> Result<FieldValue> {
        Err(Error::method_not_allowed("get", "get_value"))
    }

    /// Raw write access is not part of the public contract.
    pub fn set(&mut self, _field: impl FieldIdent, _value: impl Into<Value>) -> Result<()> {
        Err(Error::method_not_allowed("set", "set_value"))
    }

    /// Persist the row and return its id.
    ///
    /// A row without id receives the id assigned by the database.
    pub fn save(&mut self) -> Result<i64> {
        let row = self.to_raw_row()?;
        let id = self.factory.database().save(self.table.as_str(), &row)?;
        if self.id().is_none() {
            let primary_key = self.factory.primary_key().clone();
            self.store_field(&primary_key, Value::Int(id));
        }
        tracing::debug!(table = %self.table, id, "Saved row");
        Ok(id)
    }

    /// Read an auxiliary value. Common data is never resolved or persisted.
    pub fn get_common_value(&self, key: impl Into<Key>) -> FieldValue {
        self.common.get_value(key)
    }

    pub fn set_common_value(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        self.common.set_value(key, value)
    }

    pub fn common_data(&self) -> &ArrayCollection {
        &self.common
    }

    /// All auxiliary values as one decoded composite.
    pub fn common_data_as_array(&self) -> Value {
        self.common.to_value()
    }

    /// The rows of `child` whose configured parent field holds this row's id.
    ///
    /// The first call with a configured relation queries the database and
    /// memoizes the outcome for the lifetime of this row, "no children"
    /// included. Rows without id and unconfigured relations yield `None`
    /// without a query.
    pub fn get_child_data(&mut self, child: impl TableIdent) -> Result<Option<RowsRef>> {
        let child = self.factory.resolver().child_table(child)?;
        if let Some(cached) = self.children.get(&child) {
            tracing::debug!(table = %self.table, child = %child, "Child data cache hit");
            return Ok(cached.clone());
        }

        let Some(id) = self.id() else {
            return Ok(None);
        };
        let Some(child_field) = self.factory.resolver().child_field(&self.table, &child) else {
            return Ok(None);
        };

        let rows = self
            .factory
            .loader()
            .load_multiple_by_id(&child, &child_field, &Value::from(id))?;
        self.children.insert(child, rows.clone());
        Ok(rows)
    }

    /// A new row of the same table and collaborators over other raw data.
    pub fn create_from(&self, row: RawRow) -> DatabaseRowCollection {
        DatabaseRowCollection::new(self.factory.clone(), self.table.clone(), row)
    }

    /// The stored fields, read without lazy resolution.
    pub fn elements(&self) -> &ArrayCollection {
        &self.elements
    }

    pub fn lazy_cache(&self) -> &LazyCache {
        &self.lazy
    }

    /// Check if `field` currently holds a cached lazy value.
    pub fn is_resolved(&self, field: impl FieldIdent) -> Result<bool> {
        let field = field.field_name()?;
        Ok(self.lazy.contains(&self.lazy_key(&field)))
    }

    pub fn factory(&self) -> &CollectionFactory {
        &self.factory
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn raw_value(&self, field: &FieldName) -> Option<&Value> {
        self.elements.raw_get(&field.key())
    }
}

impl ToRawRow for DatabaseRowCollection {
    fn to_raw_row(&self) -> Result<RawRow> {
        self.elements.to_raw_row()
    }
}

impl fmt::Debug for DatabaseRowCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseRowCollection")
            .field("table", &self.table)
            .field("elements", &self.elements)
            .field("common", &self.common)
            .field("lazy_entries", &self.lazy.len())
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dca::{DcaRegistry, LazyDescriptor};
    use crate::memory::{MemoryDatabase, QueryOp, raw_row};

    fn setup() -> (Rc<MemoryDatabase>, CollectionFactory) {
        let news = TableName::new("tl_news").unwrap();
        let dca = DcaRegistry::new()
            .with_field_dependency(
                &news,
                &FieldName::new("author").unwrap(),
                LazyDescriptor::new("tl_member", "id", false),
            )
            .with_child_dependency(
                &news,
                &TableName::new("tl_comments").unwrap(),
                &FieldName::new("pid").unwrap(),
            );
        let db = Rc::new(
            MemoryDatabase::new()
                .with_table(
                    "tl_member",
                    [
                        raw_row([("id", Value::Int(1)), ("name", Value::from("Ada"))]),
                        raw_row([("id", Value::Int(2)), ("name", Value::from("Linus"))]),
                    ],
                )
                .with_table("tl_news", [])
                .with_table("tl_comments", [raw_row([("id", Value::Int(1)), ("pid", Value::Int(10))])]),
        );
        let factory = CollectionFactory::builder()
            .database(Rc::clone(&db))
            .metadata(Rc::new(dca))
            .build()
            .unwrap();
        (db, factory)
    }

    fn news(factory: &CollectionFactory, id: i64, author: i64) -> DatabaseRowCollection {
        factory
            .create_database_row_collection(
                "tl_news",
                raw_row([
                    ("id", Value::Int(id)),
                    ("headline", Value::from("Hello")),
                    ("author", Value::Int(author)),
                ]),
            )
            .unwrap()
    }

    fn author_name(value: &FieldValue) -> FieldValue {
        value.as_row().unwrap().borrow().elements().get_value("name")
    }

    #[test]
    fn plain_field_reads_stored_value() {
        let (db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        assert_eq!(row.get_value("headline").unwrap(), FieldValue::Scalar(Value::from("Hello")));
        assert!(row.get_value("missing").unwrap().is_null());
        assert_eq!(db.log().len(), 0);
    }

    #[test]
    fn write_invalidates_lazy_value() {
        let (db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        let first = row.get_value("author").unwrap();
        assert_eq!(author_name(&first), FieldValue::Scalar(Value::from("Ada")));
        assert!(row.is_resolved("author").unwrap());

        row.set_value("author", 2).unwrap();
        assert!(!row.is_resolved("author").unwrap());
        let second = row.get_value("author").unwrap();
        assert_eq!(author_name(&second), FieldValue::Scalar(Value::from("Linus")));
        assert_eq!(db.log().count_for(QueryOp::LoadOne, "tl_member"), 2);
    }

    #[test]
    fn primary_key_change_resets_cache() {
        let (_db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        row.get_value("author").unwrap();
        row.get_child_data("tl_comments").unwrap();
        assert_eq!(row.lazy_cache().len(), 1);

        row.set_value("id", 11).unwrap();
        assert!(row.lazy_cache().is_empty());
        assert_eq!(row.id(), Some(Key::Int(11)));
        assert!(row.get_child_data("tl_comments").unwrap().is_none());
    }

    #[test]
    fn row_handles_are_refused_on_write() {
        let (_db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        let author = row.get_value("author").unwrap();
        let err = row.set_field_value("headline", author).unwrap_err();
        match err {
            Error::TypeNotAllowed(e) => assert_eq!(e.field.as_deref(), Some("headline")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(row.get_value("headline").unwrap(), FieldValue::Scalar(Value::from("Hello")));
    }

    #[test]
    fn raw_accessors_are_refused() {
        let (_db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        assert!(matches!(row.get("headline"), Err(Error::MethodNotAllowed(_))));
        assert!(matches!(row.set("headline", 1), Err(Error::MethodNotAllowed(_))));
    }

    #[test]
    fn invalid_field_names_are_rejected() {
        let (_db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        assert!(matches!(row.get_value("head line"), Err(Error::Name(_))));
        assert!(matches!(row.set_value("", 1), Err(Error::Name(_))));
    }

    #[test]
    fn common_data_is_not_persisted() {
        let (db, factory) = setup();
        let mut row = news(&factory, 10, 1);
        row.set_common_value("formatted_date", "19.10.2026").unwrap();
        row.set_common_value("css", Value::list(["a", "b"])).unwrap();
        assert_eq!(
            row.get_common_value("formatted_date"),
            FieldValue::Scalar(Value::from("19.10.2026"))
        );
        assert_eq!(
            row.common_data_as_array(),
            Value::map([
                ("formatted_date", Value::from("19.10.2026")),
                ("css", Value::list(["a", "b"])),
            ])
        );

        row.save().unwrap();
        let stored = db.rows("tl_news");
        assert!(!stored[0].contains_key("formatted_date"));
    }

    #[test]
    fn save_assigns_new_id() {
        let (db, factory) = setup();
        let mut row = factory
            .create_database_row_collection(
                "tl_news",
                raw_row([("headline", Value::from("Draft")), ("tags", Value::list([1, 2]))]),
            )
            .unwrap();
        assert_eq!(row.id(), None);
        let id = row.save().unwrap();
        assert_eq!(row.id(), Some(Key::Int(id)));
        assert_eq!(db.rows("tl_news")[0].get("tags"), Some(&Value::from("[1,2]")));

        row.set_value("headline", "Published").unwrap();
        assert_eq!(row.save().unwrap(), id);
        assert_eq!(db.rows("tl_news").len(), 1);
        assert_eq!(db.log().count_for(QueryOp::Save, "tl_news"), 2);
    }

    #[test]
    fn create_from_shares_table() {
        let (_db, factory) = setup();
        let row = news(&factory, 10, 1);
        let mut sibling = row.create_from(raw_row([("id", Value::Int(12)), ("author", Value::Int(2))]));
        assert_eq!(sibling.table(), row.table());
        assert_eq!(sibling.id(), Some(Key::Int(12)));
        assert!(sibling.get_value("author").unwrap().as_row().is_some());
        assert!(sibling.get_value("headline").unwrap().is_null());
    }

    #[test]
    fn child_data_requires_id_and_relation() {
        let (db, factory) = setup();
        let mut unsaved = factory
            .create_database_row_collection("tl_news", RawRow::new())
            .unwrap();
        assert!(unsaved.get_child_data("tl_comments").unwrap().is_none());

        let mut row = news(&factory, 10, 1);
        assert!(row.get_child_data("tl_unrelated").unwrap().is_none());
        assert_eq!(db.log().len(), 0);

        let comments = row.get_child_data("tl_comments").unwrap().unwrap();
        assert_eq!(comments.len(), 1);
    }
}
