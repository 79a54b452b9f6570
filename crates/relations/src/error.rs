//! Error types for relation resolution
//!
//! Every failure in this crate surfaces as a [`ModelError`]. Executor failures
//! are carried through unchanged; precondition violations are raised before any
//! query is issued.

use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Database query or constraint error reported by the executor
    #[error("Database error: {0}")]
    Database(String),

    /// The operation needs a persisted record but the key is absent
    #[error("{operation}(): record in table '{table}' has no primary key value; it must exist before it can be used")]
    MissingPrimaryKey { operation: String, table: String },

    /// Relationship loading or configuration failed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Identifier or value validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Connection pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    /// Precondition violation for an operation on a record without a key
    pub fn missing_primary_key(operation: &str, table: &str) -> Self {
        ModelError::MissingPrimaryKey {
            operation: operation.to_string(),
            table: table.to_string(),
        }
    }
}

impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// Error types for query builder operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Missing required parts of a statement
    #[error("Missing fields: {0}")]
    MissingFields(String),

    /// Operation the backend cannot express
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl From<QueryError> for ModelError {
    fn from(err: QueryError) -> Self {
        ModelError::Query(err.to_string())
    }
}

/// Error types for relationship operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelationshipError {
    /// The model does not declare a relation with this name
    #[error("Relationship not found: {0}")]
    NotFound(String),

    /// Invalid relationship configuration
    #[error("Invalid relationship configuration: {0}")]
    InvalidConfiguration(String),

    /// A row came back without the column needed to match it to a parent
    #[error("Missing grouping column '{column}' in rows from '{table}'")]
    MissingGroupingColumn { column: String, table: String },
}

impl From<RelationshipError> for ModelError {
    fn from(err: RelationshipError) -> Self {
        ModelError::Relationship(err.to_string())
    }
}
