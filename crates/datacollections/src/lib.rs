//! Lazy-loading, cacheable row collections over a relational data source.
//!
//! A table row is represented by a [`DatabaseRowCollection`]. Fields whose
//! metadata ([`DcaRegistry`]) declares a lazy-load relation hold a foreign
//! key in storage; reading such a field resolves it into the referenced
//! row(s) on first access and memoizes the outcome per row. Writing the
//! field invalidates the memoized value.
//!
//! # Quick Start
//!
//! ```
//! use datacollections::prelude::*;
//! use std::rc::Rc;
//!
//! let dca = DcaRegistry::from_json_str(r#"{
//!     "tl_news": {
//!         "fields": {
//!             "author": { "lazyloading": { "table": "tl_member", "field": "id" } }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let db = Rc::new(
//!     MemoryDatabase::new()
//!         .with_table("tl_member", [raw_row([("id", Value::Int(42)), ("name", Value::from("Ada"))])])
//!         .with_table("tl_news", []),
//! );
//! let factory = CollectionFactory::builder()
//!     .database(Rc::clone(&db))
//!     .metadata(Rc::new(dca))
//!     .build()
//!     .unwrap();
//!
//! let mut news = factory
//!     .create_database_row_collection(
//!         "tl_news",
//!         raw_row([("id", Value::Int(1)), ("author", Value::Int(42))]),
//!     )
//!     .unwrap();
//!
//! let author = news.get_value("author").unwrap();
//! let name = author.as_row().unwrap().borrow().elements().get_value("name");
//! assert_eq!(name, FieldValue::Scalar(Value::from("Ada")));
//!
//! // The second read is served from the row's lazy cache.
//! news.get_value("author").unwrap();
//! assert_eq!(db.log().count(QueryOp::LoadOne), 1);
//! ```
//!
//! # Crates
//!
//! - `datacollections-core`: values, names, the serializer and database
//!   contracts, errors
//! - `datacollections`: collections, metadata, the lazy-load engine and an
//!   in-memory database

pub mod cache;
pub mod collection;
pub mod dca;
pub mod db_helper;
pub mod factory;
pub mod field_value;
pub mod iter;
pub mod lazy;
pub mod loader;
pub mod memory;
pub mod multi;
pub mod resolver;
pub mod row;

pub use cache::{
    CacheStats, LazyCache, LazyKey, LazyStore, LazyStoreFactory, MemoryLazyStore, RowIdentity,
};
pub use collection::{ArrayCollection, ToRawRow};
pub use dca::{DcaRegistry, FieldDca, LazyDescriptor, MetadataProvider, TableConfig, TableDca};
pub use db_helper::CollectionDatabaseHelper;
pub use factory::{CollectionConfig, CollectionFactory, CollectionFactoryBuilder};
pub use field_value::FieldValue;
pub use iter::CollectionIter;
pub use lazy::LazyLoader;
pub use loader::RowLoader;
pub use memory::{MemoryDatabase, QueryLog, QueryOp, QueryRecord, raw_row};
pub use multi::{MultiRowCollection, RowsRef};
pub use resolver::{Dependency, FieldDependencyResolver};
pub use row::{DatabaseRowCollection, RowRef};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        ArrayCollection, CollectionConfig, CollectionDatabaseHelper, CollectionFactory,
        DatabaseRowCollection, DcaRegistry, FieldValue, LazyDescriptor, MemoryDatabase,
        MetadataProvider, MultiRowCollection, QueryOp, RowRef, RowsRef, ToRawRow, raw_row,
    };
    pub use datacollections_core::{
        DatabaseHelper, Error, FieldIdent, FieldName, JsonSerializer, Key, OrderBy,
        OrderDirection, RawRow, Result, Serializer, TableIdent, TableName, Value, Window,
    };
}
