//! Encrypted virtual file system core: a confidential, integrity-protected
//! hierarchical namespace over an untrusted block-storage adapter.
//!
//! [`FileSystemCore`] is the single entry point: construct one with
//! [`FileSystemCore::init`] over any [`StorageAdapter`] (this crate ships
//! [`adapter::local::LocalAdapter`] for standalone use) and a derivation
//! key, then call its path-based operations. Every stored name and every
//! byte of content is encrypted; only the Storage Adapter's hashed paths
//! and blob sizes are ever visible to the underlying store.

pub mod abort;
pub mod adapter;
pub mod compress;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fs_core;
pub mod lock;
pub mod lookup_store;
pub mod naming;
pub mod path;
pub mod records;
pub mod tree_store;

pub use abort::{AbortHandle, AbortSignal};
pub use adapter::{local::LocalAdapter, Existence, StorageAdapter};
pub use config::{Config, ConfigBuilder, Label};
pub use error::{CoreError, CoreResult};
pub use fs_core::{FileDataStream, FileSystemCore, ListItem, OrphanReport, PathKind};
pub use path::LogicalPath;
pub use records::{ByteCounts, ChunkMetadata, FileData, FileRecord, FolderRecord, Metadata, RecordKind};
