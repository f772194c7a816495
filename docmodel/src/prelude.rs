//! Convenient re-exports of commonly used types from docmodel.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - The model surface and its find options
//! - Update and delete dispatch variants
//! - Schema construction and field types
//! - The backend trait and query output types
//! - Error types

pub use docmodel_core::{
    backend::{ImportSummary, QueryOutput, StoreBackend},
    error::{ModelError, ModelResult},
    expr::{FilterExpr, FilterOp, Operand, SortDirection, SortKey},
    model::{Delete, FindOptions, Model, Update},
    query::{Projection, QueryExpression, RenderedQuery, Window},
    schema::{FieldRule, FieldType, RecordBatch, Schema},
};
