//! Main docmodel crate providing a unified interface for collection-backed
//! models over document stores.
//!
//! This crate is the primary entry point for users of the docmodel framework.
//! It re-exports the core types and functionality from various sub-crates and
//! provides convenient access to storage backends.
//!
//! # Features
//!
//! - **Collection-backed models** - One model per named collection with a
//!   create/find/update/delete/count surface
//! - **Textual filter and sort expressions** - `"age >= 21"`, `"name LIKE qwe%"`,
//!   `"name ASC"`, parsed once into typed predicates
//! - **Optional schemas** - Per-model field rules with batch coercion and
//!   aggregate validation failures
//! - **Pluggable backends** - An async `StoreBackend` trait with an in-memory
//!   implementation included
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docmodel::prelude::*;
//! use docmodel::memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!
//!     let schema = Schema::new()
//!         .required_field("name", FieldType::String)
//!         .field("age", FieldType::Number);
//!
//!     let users = Model::open("users", store, Some(schema)).await?;
//!
//!     users.create(doc! { "name": "Alice", "age": 30 }).await?;
//!
//!     let found = users
//!         .find(FindOptions::new().filter("age >= 21")?.sort("name ASC")?)
//!         .await?;
//!     println!("{found:?}");
//!
//!     // Every record is stamped with a createdAt timestamp on create and an
//!     // updatedAt timestamp on every update path.
//!     let first = found.first().unwrap();
//!     let key = first.get_str("_key")?.to_string();
//!
//!     users
//!         .update(Update::ByKey { key, new_value: doc! { "age": 31 } })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing

pub mod prelude;

pub use docmodel_core::{backend, error, expr, model, query, schema};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::MemoryStore;
}
