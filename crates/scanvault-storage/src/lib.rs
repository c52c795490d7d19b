//! Scanvault Storage Library
//!
//! This crate provides the blob store abstraction and its implementations:
//! in-memory, local filesystem and S3 (or any S3-compatible provider).
//!
//! # Key format
//!
//! Blobs are keyed by the document identifier (URL-safe base64, no padding),
//! used verbatim. Keys must not contain `..`, `/` or `\`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use scanvault_core::BlobBackend;
pub use traits::{validate_key, BlobStore, StorageError, StorageResult};
