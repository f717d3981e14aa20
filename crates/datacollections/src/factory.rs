//! Collection factory and its builder.
//!
//! The factory is the one place the collaborator graph is wired. Leaf
//! collaborators (database, metadata, serializer, lazy store) are handed to
//! [`CollectionFactoryBuilder`] once; every row created by the factory keeps
//! a cheap clone of it and borrows the loaders from it on demand.
//!
//! ```
//! use datacollections::{CollectionFactory, DcaRegistry, MemoryDatabase, raw_row};
//! use datacollections_core::Value;
//! use std::rc::Rc;
//!
//! let db = Rc::new(MemoryDatabase::new().with_table("tl_news", []));
//! let factory = CollectionFactory::builder()
//!     .database(Rc::clone(&db))
//!     .metadata(Rc::new(DcaRegistry::new()))
//!     .build()
//!     .unwrap();
//!
//! let mut row = factory
//!     .create_database_row_collection("tl_news", raw_row([("headline", Value::from("Hi"))]))
//!     .unwrap();
//! assert_eq!(row.save().unwrap(), 1);
//! assert_eq!(db.rows("tl_news").len(), 1);
//! ```

use crate::cache::{LazyCache, LazyStore, LazyStoreFactory, MemoryLazyStore};
use crate::collection::ArrayCollection;
use crate::dca::MetadataProvider;
use crate::db_helper::CollectionDatabaseHelper;
use crate::iter::CollectionIter;
use crate::lazy::LazyLoader;
use crate::loader::RowLoader;
use crate::multi::MultiRowCollection;
use crate::resolver::FieldDependencyResolver;
use crate::row::{DatabaseRowCollection, RowRef};
use datacollections_core::{
    DatabaseHelper, Error, FieldName, JsonSerializer, Key, OrderDirection, RawRow, Result,
    Serializer, TableIdent, TableName, Value,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Settings shared by all collections of a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Name of the primary-key field of every table
    pub primary_key: String,
    /// Sort direction of list lookups for serialised fields
    pub list_order: OrderDirection,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            list_order: OrderDirection::Asc,
        }
    }
}

struct FactoryInner {
    database: Rc<dyn DatabaseHelper>,
    resolver: FieldDependencyResolver,
    serializer: Rc<dyn Serializer>,
    lazy_store: LazyStoreFactory,
    primary_key: FieldName,
    list_order: OrderDirection,
}

/// Creates collections sharing one set of collaborators.
///
/// Cloning is cheap; clones share the same collaborators.
#[derive(Clone)]
pub struct CollectionFactory {
    inner: Rc<FactoryInner>,
}

impl CollectionFactory {
    /// Start wiring a factory.
    pub fn builder() -> CollectionFactoryBuilder {
        CollectionFactoryBuilder::default()
    }

    pub fn database(&self) -> &dyn DatabaseHelper {
        self.inner.database.as_ref()
    }

    pub fn serializer(&self) -> &Rc<dyn Serializer> {
        &self.inner.serializer
    }

    pub fn resolver(&self) -> &FieldDependencyResolver {
        &self.inner.resolver
    }

    /// The primary-key field of every table.
    pub fn primary_key(&self) -> &FieldName {
        &self.inner.primary_key
    }

    /// Sort direction of list lookups.
    pub fn list_order(&self) -> OrderDirection {
        self.inner.list_order
    }

    /// A new, empty lazy cache for one row.
    pub fn new_lazy_cache(&self) -> LazyCache {
        LazyCache::new((self.inner.lazy_store)())
    }

    /// The loader issuing foreign lookups.
    pub fn loader(&self) -> RowLoader<'_> {
        RowLoader::new(self)
    }

    /// The orchestrator deciding how a lazy field is resolved.
    pub fn lazy_loader(&self) -> LazyLoader<'_> {
        LazyLoader::new(self)
    }

    /// A typed facade over the database collaborator.
    pub fn database_helper(&self) -> CollectionDatabaseHelper {
        CollectionDatabaseHelper::new(self.clone())
    }

    /// Create a generic collection with this factory's serializer.
    pub fn create_array_collection(&self, elements: IndexMap<Key, Value>) -> ArrayCollection {
        ArrayCollection::new(Rc::clone(&self.inner.serializer), elements)
    }

    /// Create a row of `table` from raw field data.
    pub fn create_database_row_collection(
        &self,
        table: impl TableIdent,
        row: RawRow,
    ) -> Result<DatabaseRowCollection> {
        Ok(DatabaseRowCollection::new(self.clone(), table.table_name()?, row))
    }

    /// Wrap raw rows of `table` into a multi-row collection.
    pub fn create_multi_database_row_collection(
        &self,
        table: impl TableIdent,
        rows: Vec<RawRow>,
    ) -> Result<MultiRowCollection> {
        Ok(self.multi_from_rows(&table.table_name()?, rows))
    }

    /// Iterate over a collection.
    pub fn create_collection_iterator<'a>(&self, collection: &'a ArrayCollection) -> CollectionIter<'a> {
        collection.iter()
    }

    pub(crate) fn row_ref(&self, table: &TableName, row: RawRow) -> RowRef {
        Rc::new(RefCell::new(DatabaseRowCollection::new(
            self.clone(),
            table.clone(),
            row,
        )))
    }

    pub(crate) fn multi_from_rows(&self, table: &TableName, rows: Vec<RawRow>) -> MultiRowCollection {
        let rows = rows
            .into_iter()
            .map(|row| self.row_ref(table, row))
            .collect();
        MultiRowCollection::new(table.clone(), rows, Rc::clone(&self.inner.serializer))
    }
}

impl fmt::Debug for CollectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFactory")
            .field("resolver", &self.inner.resolver)
            .field("serializer", &self.inner.serializer)
            .field("primary_key", &self.inner.primary_key)
            .field("list_order", &self.inner.list_order)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CollectionFactory`].
///
/// Database and metadata are required; the serializer defaults to
/// [`JsonSerializer`] and the lazy store to [`MemoryLazyStore`].
#[derive(Default)]
pub struct CollectionFactoryBuilder {
    database: Option<Rc<dyn DatabaseHelper>>,
    metadata: Option<Rc<dyn MetadataProvider>>,
    serializer: Option<Rc<dyn Serializer>>,
    lazy_store: Option<LazyStoreFactory>,
    config: CollectionConfig,
}

impl CollectionFactoryBuilder {
    #[must_use]
    pub fn database<D: DatabaseHelper + 'static>(mut self, database: Rc<D>) -> Self {
        let database: Rc<dyn DatabaseHelper> = database;
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn metadata<M: MetadataProvider + 'static>(mut self, metadata: Rc<M>) -> Self {
        let metadata: Rc<dyn MetadataProvider> = metadata;
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn serializer<S: Serializer + 'static>(mut self, serializer: Rc<S>) -> Self {
        let serializer: Rc<dyn Serializer> = serializer;
        self.serializer = Some(serializer);
        self
    }

    /// Use a custom store for the lazy cache of every row.
    #[must_use]
    pub fn lazy_store<F>(mut self, make_store: F) -> Self
    where
        F: Fn() -> Box<dyn LazyStore> + 'static,
    {
        let make_store: LazyStoreFactory = Rc::new(make_store);
        self.lazy_store = Some(make_store);
        self
    }

    #[must_use]
    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire the factory.
    ///
    /// Fails with a configuration error when the database or the metadata
    /// provider is missing, and with a name error when the configured
    /// primary key is not a valid field name.
    pub fn build(self) -> Result<CollectionFactory> {
        let database = self
            .database
            .ok_or_else(|| Error::config("collection factory requires a database helper"))?;
        let metadata = self
            .metadata
            .ok_or_else(|| Error::config("collection factory requires a metadata provider"))?;
        let primary_key = FieldName::new(self.config.primary_key.as_str())?;
        let serializer = self
            .serializer
            .unwrap_or_else(|| Rc::new(JsonSerializer::new()));
        let lazy_store = self.lazy_store.unwrap_or_else(memory_lazy_store);

        tracing::debug!(
            primary_key = %primary_key,
            list_order = self.config.list_order.as_sql(),
            "Collection factory built"
        );

        Ok(CollectionFactory {
            inner: Rc::new(FactoryInner {
                database,
                resolver: FieldDependencyResolver::new(metadata),
                serializer,
                lazy_store,
                primary_key,
                list_order: self.config.list_order,
            }),
        })
    }
}

fn memory_lazy_store() -> LazyStoreFactory {
    Rc::new(|| -> Box<dyn LazyStore> { Box::new(MemoryLazyStore::new()) })
}

impl fmt::Debug for CollectionFactoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFactoryBuilder")
            .field("database", &self.database.is_some())
            .field("metadata", &self.metadata)
            .field("serializer", &self.serializer)
            .field("lazy_store", &self.lazy_store.is_some())
            .field("config", &self.config)
            .finish()
    }
}
