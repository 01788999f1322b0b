//! # Tree Store (C6)
//!
//! A thin façade over the [`StorageAdapter`], rooted at a sibling hashed
//! subfolder of the storage root. Holds the hierarchical skeleton (hashed
//! folder directories) and the small metadata sidecar files describing each
//! folder/file — never content. Built the way the teacher's `Cache` and
//! `Fetcher` are thin façades over `std::fs`.

use std::sync::Arc;

use crate::adapter::{Existence, StorageAdapter};
use crate::error::CoreResult;

pub struct TreeStore {
    adapter: Arc<dyn StorageAdapter>,
    /// Absolute adapter path prefix this store is rooted at, e.g.
    /// `/<root>/<tree-hash>`. Never ends in `/`.
    prefix: String,
}

impl TreeStore {
    pub fn new(adapter: Arc<dyn StorageAdapter>, prefix: String) -> Self {
        Self { adapter, prefix }
    }

    fn full(&self, relative: &str) -> String {
        format!("{}{}", self.prefix, relative)
    }

    pub fn exists(&self, relative: &str) -> CoreResult<Existence> {
        self.adapter.exists(&self.full(relative))
    }

    pub fn create_folder(&self, relative: &str) -> CoreResult<()> {
        self.adapter.create_folder(&self.full(relative))
    }

    pub fn create_file(&self, relative: &str) -> CoreResult<()> {
        self.adapter.create_file(&self.full(relative))
    }

    pub fn read(&self, relative: &str) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut self.adapter.get_file_data(&self.full(relative))?, &mut buf)?;
        Ok(buf)
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) -> CoreResult<()> {
        self.adapter.set_file_data(&self.full(relative), &mut &bytes[..])
    }

    pub fn delete_folder(&self, relative: &str, is_okay_if_not_exists: bool) -> CoreResult<()> {
        self.adapter
            .delete_folder(&self.full(relative), is_okay_if_not_exists)
    }

    pub fn delete_file(&self, relative: &str, is_okay_if_not_exists: bool) -> CoreResult<()> {
        self.adapter
            .delete_file(&self.full(relative), is_okay_if_not_exists)
    }

    /// Lists the immediate children of a hashed folder, as paths relative
    /// to this store's root (i.e. with the store prefix stripped back off).
    pub fn list_folder(&self, relative: &str) -> CoreResult<Vec<String>> {
        let children = self.adapter.list_folder(&self.full(relative))?;
        Ok(children
            .into_iter()
            .map(|full| full.strip_prefix(&self.prefix).unwrap_or(&full).to_string())
            .collect())
    }

    pub fn has_native_rename(&self) -> bool {
        self.adapter.has_native_support_for_renaming()
    }

    pub fn rename_folder(&self, relative: &str, new_leaf: &str) -> CoreResult<()> {
        self.adapter.rename_folder(&self.full(relative), new_leaf)
    }

    pub fn rename_file(&self, relative: &str, new_leaf: &str) -> CoreResult<()> {
        self.adapter.rename_file(&self.full(relative), new_leaf)
    }
}
