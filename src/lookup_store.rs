//! # Lookup Store (C7)
//!
//! Holds content blobs and name-recovery sidecars under a two-level
//! fan-out directory scheme: the first two base32 characters of a locator
//! token select a level-1 directory, the next two select a level-2
//! directory, and the remaining characters (plus a `.data`/`.name` suffix)
//! name the file. With a 32-symbol alphabet this caps each concrete
//! directory at roughly 1,024 entries (spec §4.7) — the same shape as the
//! teacher's `Cache`/`compose_object_path` two-level hex fan-out, lifted to
//! a keyed-hash locator instead of a content hash.

use std::sync::Arc;

use crate::adapter::StorageAdapter;
use crate::crypto::envelope;
use crate::error::{CoreError, CoreResult};
use crate::naming::{pae, NameHasher};

pub struct LookupStore {
    adapter: Arc<dyn StorageAdapter>,
    /// Absolute adapter path prefix, e.g. `/<root>/<lookup-hash>`.
    prefix: String,
}

impl LookupStore {
    pub fn new(adapter: Arc<dyn StorageAdapter>, prefix: String) -> Self {
        Self { adapter, prefix }
    }

    fn fanout_path(&self, token: &str, suffix: &str) -> CoreResult<String> {
        if token.len() < 5 {
            return Err(CoreError::Corruption(format!(
                "locator token too short for fan-out: {token}"
            )));
        }
        let (c1c2, rest) = token.split_at(2);
        let (c3c4, rest) = rest.split_at(2);
        Ok(format!("{}/{c1c2}/{c3c4}/{rest}{suffix}", self.prefix))
    }

    /// Locator for the content blob or aggregate-header blob of chunk
    /// `chunk_index` within file `uid`.
    pub fn blob_path(&self, hasher: &NameHasher, uid: &str, chunk_index: u32) -> CoreResult<String> {
        let token = hasher.hash_frame(&pae(&[uid.as_bytes(), &chunk_index.to_le_bytes()]));
        self.fanout_path(&token, ".data")
    }

    /// Locator for the name-recovery sidecar of a hashed path component.
    pub fn name_recovery_path(&self, hasher: &NameHasher, hashed_component: &str) -> CoreResult<String> {
        let token = hasher.hash_frame(&pae(&[hashed_component.as_bytes()]));
        self.fanout_path(&token, ".name")
    }

    pub fn read_blob(&self, path: &str) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut self.adapter.get_file_data(path)?, &mut buf)?;
        Ok(buf)
    }

    pub fn write_blob(&self, path: &str, bytes: &[u8]) -> CoreResult<()> {
        self.adapter.set_file_data(path, &mut &bytes[..])
    }

    pub fn delete_blob(&self, path: &str, is_okay_if_not_exists: bool) -> CoreResult<()> {
        self.adapter.delete_file(path, is_okay_if_not_exists)
    }

    pub fn blob_exists(&self, path: &str) -> CoreResult<bool> {
        Ok(self.adapter.has_file_data(path).unwrap_or(false)
            || matches!(self.adapter.exists(path)?, crate::adapter::Existence::File))
    }

    /// Writes a fresh name-recovery sidecar. Append-only: may be called
    /// again for the same hashed component (e.g. re-creating a path that
    /// was deleted and recreated) without harm, since the plaintext name
    /// recovered is always identical for the same hashed component.
    pub fn write_name_recovery(
        &self,
        hasher: &NameHasher,
        hashed_component: &str,
        plaintext_component: &str,
        envelope_key: &[u8],
    ) -> CoreResult<()> {
        let path = self.name_recovery_path(hasher, hashed_component)?;
        let sealed = envelope::seal(envelope_key, plaintext_component.as_bytes(), b"name-recovery")?;
        self.write_blob(&path, &sealed)
    }

    pub fn read_name_recovery(
        &self,
        hasher: &NameHasher,
        hashed_component: &str,
        envelope_key: &[u8],
    ) -> CoreResult<String> {
        let path = self.name_recovery_path(hasher, hashed_component)?;
        let sealed = self.read_blob(&path)?;
        let plaintext = envelope::open(envelope_key, &sealed, b"name-recovery")?;
        String::from_utf8(plaintext)
            .map_err(|e| CoreError::Corruption(format!("name-recovery sidecar not UTF-8: {e}")))
    }

    /// Walks the full two-level fan-out and returns every content / aggregate-header
    /// blob path (entries ending in `.data`), skipping name-recovery sidecars
    /// (`.name`). Used by the background integrity sweep (`FileSystemCore::sweep_orphans`)
    /// to find blobs no current file record references.
    pub fn walk_blob_paths(&self) -> CoreResult<Vec<String>> {
        let mut out = Vec::new();
        for level1 in self.adapter.list_folder(&self.prefix)? {
            if !level1.ends_with('/') {
                continue;
            }
            for level2 in self.adapter.list_folder(&level1)? {
                if !level2.ends_with('/') {
                    continue;
                }
                for entry in self.adapter.list_folder(&level2)? {
                    if entry.ends_with(".data") {
                        out.push(entry);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_splits_first_four_characters() {
        let adapter: Arc<dyn StorageAdapter> =
            Arc::new(crate::adapter::local::LocalAdapter::new(std::env::temp_dir().join("unused")).unwrap());
        let store = LookupStore::new(adapter, "/root/lookup".to_string());
        let path = store.fanout_path("abcdefghij", ".data").unwrap();
        assert_eq!(path, "/root/lookup/ab/cd/efghij.data");
    }
}
