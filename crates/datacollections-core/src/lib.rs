//! Core types and collaborator contracts for lazy-loading data collections.
//!
//! This crate provides the leaf pieces the collection engine is built on:
//!
//! - [`Value`] and [`Key`] for dynamically typed field data
//! - [`TableName`] / [`FieldName`] validated identifiers and the
//!   [`TableIdent`] / [`FieldIdent`] name-provider traits
//! - [`Serializer`] for converting composites to and from their storage form
//! - [`DatabaseHelper`] for the row lookups lazy resolution delegates to
//! - [`Error`] and the crate-wide [`Result`] alias

pub mod database;
pub mod error;
pub mod names;
pub mod serialize;
pub mod value;

pub use database::{DatabaseHelper, OrderBy, OrderDirection, RawRow, Window};
pub use error::{
    ConfigError, DatabaseError, DatabaseErrorKind, Error, MethodNotAllowedError, NameError,
    NameErrorKind, Result, TypeNotAllowedError,
};
pub use names::{FieldIdent, FieldName, MAX_IDENTIFIER_LEN, TableIdent, TableName};
pub use serialize::{JsonSerializer, Serializer};
pub use value::{Key, Value};
