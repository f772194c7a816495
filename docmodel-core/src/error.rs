//! Error types and result types for model operations.
//!
//! This module provides error handling for parsing, validation, and store
//! operations. Use [`ModelResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with a model.
///
/// Parse errors (`InvalidExpression`, `UnsupportedOperator`,
/// `InvalidSortDirection`) are raised synchronously before any store call is
/// issued. Store-side errors propagate to the caller unmodified; no operation
/// converts a failure into a log line and a successful-looking return.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A filter or sort expression did not tokenize into the expected shape.
    /// Carries the original expression string.
    #[error("Invalid expression `{0}`")]
    InvalidExpression(String),
    /// A filter expression used an operator outside the supported set.
    /// Carries the offending operator token.
    #[error("Unsupported operator `{0}`")]
    UnsupportedOperator(String),
    /// A sort expression used a direction token other than `ASC`, `DESC`, `1`, `0`.
    #[error("Invalid sort direction `{0}`")]
    InvalidSortDirection(String),
    /// One or more records violated the schema. Aggregates every offending
    /// field across the whole batch; nothing is committed on failure.
    #[error("Validation failed: {}", violations.join("; "))]
    Validation {
        /// Human-readable description of each violation.
        violations: Vec<String>,
    },
    /// Serialization/deserialization error when converting record values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The requested record was not found in the collection.
    /// The first argument is the record key, the second is the collection name.
    #[error("Record {0} not found in collection {1}")]
    RecordNotFound(String, String),
    /// An opaque error from the underlying store client.
    #[error("Store error: {0}")]
    Store(String),
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Builds an aggregate validation error from a list of violations.
    pub fn validation(violations: Vec<String>) -> Self {
        ModelError::Validation { violations }
    }
}

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for ModelError {
    fn from(err: SerdeJsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
