//! Cloudflare R2 storage client and thumbnail cache.
//!
//! This crate provides:
//! - Object upload/download with metadata tags
//! - Presigned URL generation (video sources)
//! - The permanent, key-addressed thumbnail cache (R2-backed and in-memory)

pub mod cache;
pub mod client;
pub mod error;
pub mod memory;
pub mod metadata;

pub use cache::{thumbnail_key, PutOutcome, R2ThumbnailCache, ThumbnailCache, DEFAULT_CACHE_PREFIX};
pub use client::{R2Client, R2Config, StoredObject};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryThumbnailCache;
