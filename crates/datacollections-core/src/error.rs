//! Error types for data collection operations.
//!
//! Missing lazy-load configuration is not an error anywhere in this
//! workspace; it is expressed as `None`/`false` by the resolver. The variants
//! below cover contract violations, invalid identifiers and collaborator
//! failures only.

use std::fmt;

/// The primary error type for all data collection operations.
#[derive(Debug)]
pub enum Error {
    /// A low-level accessor that bypasses (de)serialization was called
    MethodNotAllowed(MethodNotAllowedError),
    /// A value could not be encoded into its storage form
    TypeNotAllowed(TypeNotAllowedError),
    /// An invalid table or field identifier
    Name(NameError),
    /// The database collaborator failed
    Database(DatabaseError),
    /// Metadata or factory configuration errors
    Config(ConfigError),
    /// Serialization/deserialization errors
    Serde(String),
}

#[derive(Debug, Clone)]
pub struct MethodNotAllowedError {
    /// The method that was called
    pub method: &'static str,
    /// The serialize-aware accessor to call instead
    pub use_instead: &'static str,
}

#[derive(Debug, Clone)]
pub struct TypeNotAllowedError {
    /// Field (or collection key) the value was written to, when known
    pub field: Option<String>,
    /// What was actually passed
    pub actual: String,
    /// Why the value has no storage form
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NameError {
    pub kind: NameErrorKind,
    /// The rejected identifier
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameErrorKind {
    /// Identifier is empty
    Empty,
    /// Identifier contains characters outside `[A-Za-z0-9_]` or starts with a digit
    InvalidCharacters,
    /// Identifier exceeds the maximum identifier length
    TooLong,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    /// Table the failing operation targeted, if any
    pub table: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// Query execution failed
    Query,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Connection lost or unavailable
    Connection,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a `MethodNotAllowed` error for a raw accessor.
    pub fn method_not_allowed(method: &'static str, use_instead: &'static str) -> Self {
        Error::MethodNotAllowed(MethodNotAllowedError {
            method,
            use_instead,
        })
    }

    /// Create a `TypeNotAllowed` error.
    pub fn type_not_allowed(
        field: Option<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::TypeNotAllowed(TypeNotAllowedError {
            field,
            actual: actual.into(),
            message: message.into(),
        })
    }

    /// Create a configuration error without an underlying cause.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Is this a programming-contract violation (disallowed access or value shape)?
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::MethodNotAllowed(_) | Error::TypeNotAllowed(_))
    }

    /// Is this a failure reported by the database collaborator?
    pub fn is_database_error(&self) -> bool {
        matches!(self, Error::Database(_))
    }

    /// Attach a field name to a `TypeNotAllowed` error that does not carry one yet.
    #[must_use]
    pub fn with_field(self, field: &str) -> Self {
        match self {
            Error::TypeNotAllowed(mut e) if e.field.is_none() => {
                e.field = Some(field.to_string());
                Error::TypeNotAllowed(e)
            }
            other => other,
        }
    }
}

impl DatabaseError {
    /// Create a database error for the given table.
    pub fn new(kind: DatabaseErrorKind, table: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.map(str::to_string),
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MethodNotAllowed(e) => write!(f, "Method not allowed: {}", e),
            Error::TypeNotAllowed(e) => write!(f, "Type not allowed: {}", e),
            Error::Name(e) => write!(f, "Invalid name: {}", e),
            Error::Database(e) => write!(f, "Database error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for MethodNotAllowedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` may not be called on this object, use `{}` instead",
            self.method, self.use_instead
        )
    }
}

impl fmt::Display for TypeNotAllowedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "value for '{}' ", field)?,
            None => write!(f, "value ")?,
        }
        write!(
            f,
            "has to be a scalar or structured data, got {}: {}",
            self.actual, self.message
        )
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NameErrorKind::Empty => write!(f, "identifier must not be empty"),
            NameErrorKind::InvalidCharacters => {
                write!(f, "identifier '{}' contains invalid characters", self.name)
            }
            NameErrorKind::TooLong => write!(f, "identifier '{}' is too long", self.name),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{} (table '{}')", self.message, table)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<MethodNotAllowedError> for Error {
    fn from(err: MethodNotAllowedError) -> Self {
        Error::MethodNotAllowed(err)
    }
}

impl From<TypeNotAllowedError> for Error {
    fn from(err: TypeNotAllowedError) -> Self {
        Error::TypeNotAllowed(err)
    }
}

impl From<NameError> for Error {
    fn from(err: NameError) -> Self {
        Error::Name(err)
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for data collection operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_violation_flags() {
        let raw = Error::method_not_allowed("set", "set_value");
        assert!(raw.is_contract_violation());
        assert!(!raw.is_database_error());
        assert_eq!(
            raw.to_string(),
            "Method not allowed: `set` may not be called on this object, use `set_value` instead"
        );

        let db = Error::Database(DatabaseError::new(
            DatabaseErrorKind::Query,
            Some("users"),
            "syntax error",
        ));
        assert!(db.is_database_error());
        assert!(!db.is_contract_violation());
        assert_eq!(db.to_string(), "Database error: syntax error (table 'users')");
    }

    #[test]
    fn with_field_fills_missing_field_only() {
        let err = Error::type_not_allowed(None, "row handle", "resolved rows are not stored")
            .with_field("owner_id");
        match &err {
            Error::TypeNotAllowed(e) => assert_eq!(e.field.as_deref(), Some("owner_id")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Type not allowed: value for 'owner_id' has to be a scalar or structured data, \
             got row handle: resolved rows are not stored"
        );

        let kept = Error::type_not_allowed(Some("tags".into()), "NaN", "not representable in JSON")
            .with_field("other");
        match kept {
            Error::TypeNotAllowed(e) => assert_eq!(e.field.as_deref(), Some("tags")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn source_is_exposed_for_database_errors() {
        use std::error::Error as _;

        let io = std::io::Error::other("socket closed");
        let err = Error::Database(DatabaseError {
            kind: DatabaseErrorKind::Connection,
            table: None,
            message: "connection lost".to_string(),
            source: Some(Box::new(io)),
        });
        assert!(err.source().is_some());
        assert!(Error::config("missing database").source().is_none());
    }
}
