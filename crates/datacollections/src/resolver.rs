//! Answers lazy-load questions about a table field.

use crate::dca::{LazyDescriptor, MetadataProvider};
use datacollections_core::{FieldName, Result, TableIdent, TableName};
use std::rc::Rc;

/// A fully resolved foreign relation of a lazy-load field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub foreign_table: TableName,
    pub foreign_field: FieldName,
    pub serialised: bool,
}

/// Reads lazy-load metadata for table fields.
///
/// Every question degrades to `None`/`false` when the configuration is
/// missing at any level. Configured names that fail validation are logged
/// and treated as missing too.
#[derive(Debug, Clone)]
pub struct FieldDependencyResolver {
    metadata: Rc<dyn MetadataProvider>,
}

impl FieldDependencyResolver {
    pub fn new(metadata: Rc<dyn MetadataProvider>) -> Self {
        Self { metadata }
    }

    fn descriptor(&self, table: &TableName, field: &FieldName) -> Option<LazyDescriptor> {
        self.metadata.dependencies(table, field)
    }

    /// Check if the field declares a non-empty lazy-load descriptor.
    pub fn is_lazy_loading_field(&self, table: &TableName, field: &FieldName) -> bool {
        self.descriptor(table, field).is_some()
    }

    /// The configured foreign table of a lazy-load field.
    pub fn foreign_table(&self, table: &TableName, field: &FieldName) -> Option<TableName> {
        let name = self.descriptor(table, field)?.table?;
        TableName::new(name.as_str())
            .inspect_err(|e| {
                tracing::warn!(%table, %field, foreign_table = %name, error = %e, "Ignoring invalid foreign table");
            })
            .ok()
    }

    /// The configured foreign field of a lazy-load field.
    pub fn foreign_field(&self, table: &TableName, field: &FieldName) -> Option<FieldName> {
        let name = self.descriptor(table, field)?.field?;
        FieldName::new(name.as_str())
            .inspect_err(|e| {
                tracing::warn!(%table, %field, foreign_field = %name, error = %e, "Ignoring invalid foreign field");
            })
            .ok()
    }

    /// Check if the stored value of the field is an encoded list of foreign keys.
    pub fn is_serialised(&self, table: &TableName, field: &FieldName) -> bool {
        self.descriptor(table, field).is_some_and(|d| d.serialised)
    }

    /// Resolve the whole relation at once.
    ///
    /// `None` when the field is not lazy-loadable or the foreign table or
    /// field is missing.
    pub fn dependency(&self, table: &TableName, field: &FieldName) -> Option<Dependency> {
        if !self.is_lazy_loading_field(table, field) {
            return None;
        }
        Some(Dependency {
            foreign_table: self.foreign_table(table, field)?,
            foreign_field: self.foreign_field(table, field)?,
            serialised: self.is_serialised(table, field),
        })
    }

    /// Normalize a child table identifier.
    pub fn child_table(&self, table: impl TableIdent) -> Result<TableName> {
        table.table_name()
    }

    /// The field in `child` holding the parent id, if the relation is declared.
    pub fn child_field(&self, parent: &TableName, child: &TableName) -> Option<FieldName> {
        let name = self.metadata.child_dependencies(parent, child)?;
        FieldName::new(name.as_str())
            .inspect_err(|e| {
                tracing::warn!(%parent, %child, child_field = %name, error = %e, "Ignoring invalid child field");
            })
            .ok()
    }
}
