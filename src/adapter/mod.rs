//! # Storage Adapter interface (C5)
//!
//! The narrow byte-level contract the core speaks against. The adapter
//! deals exclusively in hashed paths (spec §6.1) — it never sees plaintext
//! names or content. This is the pluggable boundary: production users
//! supply their own adapter (an object store, a browser-local store, a
//! different on-disk layout); this crate ships [`local::LocalAdapter`]
//! purely so it is runnable and testable standalone.

pub mod local;

use std::io::Read;

use crate::error::CoreResult;

/// What `exists` found at a hashed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Absent,
    File,
    Folder,
}

/// Byte-level operations on the underlying store, keyed entirely by hashed
/// paths (spec §6.1).
pub trait StorageAdapter: Send + Sync {
    fn exists(&self, path: &str) -> CoreResult<Existence>;

    fn create_folder(&self, path: &str) -> CoreResult<()>;

    fn create_file(&self, path: &str) -> CoreResult<()>;

    fn has_file_data(&self, path: &str) -> CoreResult<bool>;

    /// Opens a file's bytes for reading. Returns `NotFound` if absent.
    fn get_file_data(&self, path: &str) -> CoreResult<Box<dyn Read + Send>>;

    /// Replaces a file's bytes, reading to exhaustion from `data`.
    fn set_file_data(&self, path: &str, data: &mut dyn Read) -> CoreResult<()>;

    fn has_native_support_for_renaming(&self) -> bool;

    /// Renames a folder's leaf component in place. Only called when
    /// [`has_native_support_for_renaming`] is true.
    fn rename_folder(&self, path: &str, new_name: &str) -> CoreResult<()>;

    /// Renames a file's leaf component in place. Only called when
    /// [`has_native_support_for_renaming`] is true.
    fn rename_file(&self, path: &str, new_name: &str) -> CoreResult<()>;

    /// Lists the immediate children of a folder, as complete hashed paths.
    fn list_folder(&self, path: &str) -> CoreResult<Vec<String>>;

    fn delete_folder(&self, path: &str, is_okay_if_not_exists: bool) -> CoreResult<()>;

    fn delete_file(&self, path: &str, is_okay_if_not_exists: bool) -> CoreResult<()>;
}
