//! In-memory storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait. It uses async-aware read-write locks for concurrent
//! access and is ideal for development, testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Type-erased storage** - Stores records as BSON documents
//! - **Full query support** - Filtering, sorting, and pagination, evaluated in memory
//! - **Deterministic order** - Collections preserve insertion order
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docmodel_core::model::{FindOptions, Model};
//! use docmodel_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let model = Model::open("users", store, None).await?;
//!
//!     model.create(doc! { "name": "Alice", "age": 30 }).await?;
//!
//!     let adults = model
//!         .find(FindOptions::new().filter("age >= 18")?.sort("name ASC")?)
//!         .await?;
//!     println!("{adults:?}");
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod evaluator;
pub mod store;

pub use store::MemoryStore;
