//! Scanvault Database Library
//!
//! This crate provides the metadata store abstraction and its
//! implementations: an in-memory store for tests and single-node runs, and a
//! PostgreSQL store backed by `sqlx`.

pub mod factory;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use factory::create_metadata_store;
pub use memory::MemoryMetadataStore;
pub use postgres::{connect_pool, PostgresMetadataStore};
pub use traits::{MetadataError, MetadataResult, MetadataStore};
