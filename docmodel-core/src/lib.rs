//! Core of the docmodel project: a thin, collection-backed model layer over
//! document stores.
//!
//! This crate provides:
//!
//! - **Expression parsing** ([`expr`]) - The textual filter/sort DSL and its
//!   typed operand classification
//! - **Query building** ([`query`]) - Store-agnostic query composition with
//!   parameterized rendering
//! - **Schema validation** ([`schema`]) - Optional per-model schemas with
//!   batch coercion and aggregate failures
//! - **Store backend abstraction** ([`backend`]) - The async trait storage
//!   backends implement
//! - **Model orchestration** ([`model`]) - The create/find/update/delete/count
//!   surface over a named collection
//! - **Error handling** ([`error`]) - Error taxonomy and result alias
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docmodel_core::model::{FindOptions, Model};
//! use docmodel_core::schema::{FieldType, Schema};
//!
//! let schema = Schema::new()
//!     .required_field("name", FieldType::String)
//!     .field("age", FieldType::Number);
//!
//! let model = Model::open("users", backend, Some(schema)).await?;
//!
//! model.create(doc! { "name": "Alice", "age": 30 }).await?;
//!
//! let found = model
//!     .find(FindOptions::new().filter("age >= 21")?.sort("name ASC")?)
//!     .await?;
//! ```

pub mod backend;
pub mod error;
pub mod expr;
pub mod model;
pub mod query;
pub mod schema;
