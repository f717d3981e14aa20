//! Lazy-load orchestration.
//!
//! Given the stored scalar of a field, decide whether it is a foreign-key
//! reference and resolve it with a single-row or a list lookup. Caching of
//! the outcome is left to the owning row.

use crate::factory::CollectionFactory;
use crate::field_value::FieldValue;
use datacollections_core::{FieldName, Result, TableName, Value};

#[derive(Debug, Clone, Copy)]
pub struct LazyLoader<'f> {
    factory: &'f CollectionFactory,
}

impl<'f> LazyLoader<'f> {
    pub fn new(factory: &'f CollectionFactory) -> Self {
        Self { factory }
    }

    /// Check if a stored value of `table.field` goes through lazy resolution.
    ///
    /// Only scalars stored in lazy-load fields do; NULL and composites are
    /// returned as they are. Serialised fields hold an encoded list by
    /// definition, any other field whose stored text decodes to a composite
    /// is a composite.
    pub fn is_resolvable(&self, table: &TableName, field: &FieldName, raw: &Value) -> bool {
        let resolver = self.factory.resolver();
        if !raw.is_scalar() || !resolver.is_lazy_loading_field(table, field) {
            return false;
        }
        resolver.is_serialised(table, field)
            || !self.factory.serializer().unserialize(raw).is_composite()
    }

    /// Resolve the stored scalar `value` of `table.field`.
    ///
    /// Returns [`FieldValue::Row`] for plain relations and
    /// [`FieldValue::Rows`] for serialised ones. Nothing found, or a relation
    /// missing its foreign table or field, resolves to [`FieldValue::Null`].
    pub fn load_data(&self, table: &TableName, field: &FieldName, value: &Value) -> Result<FieldValue> {
        let Some(dependency) = self.factory.resolver().dependency(table, field) else {
            tracing::debug!(%table, %field, "Lazy field has no usable relation");
            return Ok(FieldValue::Null);
        };

        let loader = self.factory.loader();
        let resolved = if dependency.serialised {
            loader
                .load_multiple(&dependency.foreign_table, &dependency.foreign_field, value)?
                .map(FieldValue::Rows)
        } else {
            loader
                .load_one(&dependency.foreign_table, &dependency.foreign_field, value)?
                .map(FieldValue::Row)
        };

        tracing::debug!(
            %table,
            %field,
            foreign_table = %dependency.foreign_table,
            serialised = dependency.serialised,
            found = resolved.is_some(),
            "Resolved lazy field"
        );
        Ok(resolved.unwrap_or(FieldValue::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dca::{DcaRegistry, LazyDescriptor};
    use crate::memory::{MemoryDatabase, QueryOp, raw_row};
    use std::rc::Rc;

    fn names(table: &str, field: &str) -> (TableName, FieldName) {
        (TableName::new(table).unwrap(), FieldName::new(field).unwrap())
    }

    fn setup() -> (Rc<MemoryDatabase>, CollectionFactory) {
        let (news, author) = names("tl_news", "author");
        let (_, tags) = names("tl_news", "tags");
        let (_, broken) = names("tl_news", "broken");
        let dca = DcaRegistry::new()
            .with_field_dependency(&news, &author, LazyDescriptor::new("tl_member", "id", false))
            .with_field_dependency(&news, &tags, LazyDescriptor::new("tl_tag", "id", true))
            .with_field_dependency(&news, &broken, LazyDescriptor::new("tl_member", "", false));
        let db = Rc::new(
            MemoryDatabase::new()
                .with_table("tl_member", [raw_row([("id", Value::Int(42))])])
                .with_table("tl_tag", [raw_row([("id", Value::Int(3))]), raw_row([("id", Value::Int(7))])]),
        );
        let factory = CollectionFactory::builder()
            .database(Rc::clone(&db))
            .metadata(Rc::new(dca))
            .build()
            .unwrap();
        (db, factory)
    }

    #[test]
    fn single_relation_resolves_to_row() {
        let (db, factory) = setup();
        let (t, f) = names("tl_news", "author");
        let resolved = factory.lazy_loader().load_data(&t, &f, &Value::Int(42)).unwrap();
        assert!(resolved.as_row().is_some());
        assert_eq!(db.log().count_for(QueryOp::LoadOne, "tl_member"), 1);
    }

    #[test]
    fn serialised_relation_resolves_to_rows() {
        let (_db, factory) = setup();
        let (t, f) = names("tl_news", "tags");
        let resolved = factory.lazy_loader().load_data(&t, &f, &Value::from("[3,7]")).unwrap();
        assert_eq!(resolved.as_rows().map(|r| r.len()), Some(2));
    }

    #[test]
    fn missing_relation_parts_resolve_to_null() {
        let (db, factory) = setup();
        let (t, f) = names("tl_news", "broken");
        let loader = factory.lazy_loader();
        assert!(loader.is_resolvable(&t, &f, &Value::Int(1)));
        assert!(loader.load_data(&t, &f, &Value::Int(1)).unwrap().is_null());
        assert_eq!(db.log().len(), 0);
    }

    #[test]
    fn only_scalars_of_lazy_fields_are_resolvable() {
        let (_db, factory) = setup();
        let loader = factory.lazy_loader();
        let (t, author) = names("tl_news", "author");
        let (_, headline) = names("tl_news", "headline");
        assert!(loader.is_resolvable(&t, &author, &Value::Int(42)));
        assert!(!loader.is_resolvable(&t, &author, &Value::Null));
        assert!(!loader.is_resolvable(&t, &author, &Value::list([1])));
        assert!(!loader.is_resolvable(&t, &headline, &Value::from("Hello")));
    }

    #[test]
    fn encoded_composites_resolve_only_for_serialised_fields() {
        let (_db, factory) = setup();
        let loader = factory.lazy_loader();
        let (t, author) = names("tl_news", "author");
        let (_, tags) = names("tl_news", "tags");
        assert!(!loader.is_resolvable(&t, &author, &Value::from("[42]")));
        assert!(!loader.is_resolvable(&t, &author, &Value::from(r#"{"id": 42}"#)));
        assert!(loader.is_resolvable(&t, &author, &Value::from("42")));
        assert!(loader.is_resolvable(&t, &tags, &Value::from("[3,7]")));
    }
}
