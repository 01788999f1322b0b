//! # File System Core (C8)
//!
//! Orchestrates the Path resolver, Name Hasher, Crypto Envelope, Lock
//! Manager, Tree Store and Lookup Store into the public operations spec.md
//! §4.8 describes: acquire the appropriate turn(s), validate preconditions,
//! do the work, release turns on every exit path (via `Turn`'s `Drop`), and
//! return a tagged result. Built the way the teacher's `Repository` sits on
//! top of `Fetcher`/`Cache`/`Catalog` as the one façade client code talks to.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::abort::{self, AbortSignal};
use crate::adapter::{Existence, StorageAdapter};
use crate::compress;
use crate::config::Config;
use crate::crypto::{envelope, keys, stream};
use crate::error::{CoreError, CoreResult};
use crate::lock::{LockManager, Turn};
use crate::lookup_store::LookupStore;
use crate::naming::{pae, NameHasher};
use crate::path::{self, LogicalPath, PathSet};
use crate::records::{
    fresh_uid, ByteCounts, ChunkMetadata, FileData, FileRecord, FolderRecord, Metadata, RecordKind,
};
use crate::tree_store::TreeStore;

/// What a path resolves to, mirroring spec.md §4.8.2's three-way result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Absent,
    File,
    Folder,
}

/// One entry yielded by `list_folder`. A per-entry failure does not abort
/// the enumeration (spec.md §4.8.14): it is yielded as `Error` and iteration
/// continues with the next sibling.
#[derive(Debug)]
pub enum ListItem {
    Folder(FolderRecord),
    File(FileRecord),
    Error(CoreError),
}

struct ListedEntry {
    name: String,
    is_folder: bool,
}

/// Report produced by the background integrity sweep (SPEC_FULL.md §9's
/// resolution of spec.md §9's "background integrity sweep" open item).
#[derive(Debug, Default)]
pub struct OrphanReport {
    pub orphan_blobs: Vec<String>,
}

/// Orchestrates every public operation of the encrypted virtual file
/// system over a pluggable [`StorageAdapter`].
pub struct FileSystemCore {
    adapter: Arc<dyn StorageAdapter>,
    config: Config,
    hasher: NameHasher,
    persistent: keys::PersistentKeys,
    locks: LockManager,
    tree: TreeStore,
    lookup: LookupStore,
}

impl FileSystemCore {
    /// Phase 1: derive the intermediate keys from `derivation_key`, compute
    /// the root directory name, create the root if absent, and open/create
    /// the keys-record. Phase 2: import the persistent keys and open the
    /// Tree/Lookup Store subfolders. On any step failure nothing partial is
    /// committed to this `FileSystemCore` value; the adapter may already
    /// hold created directories, which a later `init` will find and reuse.
    pub fn init(
        adapter: Arc<dyn StorageAdapter>,
        derivation_key: &[u8],
        config: Config,
    ) -> CoreResult<Self> {
        let intermediate = keys::derive_intermediate_keys(derivation_key, &config);
        let intermediate_hasher = NameHasher::new(intermediate.naming_key.to_vec(), false);
        let root_token = intermediate_hasher.hash_component("root");
        let root_name = &root_token[..root_token.len().min(16)];
        let root_prefix = format!("/{root_name}");

        adapter.create_folder(&format!("{root_prefix}/"))?;
        let keys_record_path = format!("{root_prefix}/keys");
        let persistent = match adapter.exists(&keys_record_path)? {
            Existence::Absent => {
                log::debug!("init: no keys-record found, generating persistent key material");
                let generated = keys::generate_persistent_keys();
                let sealed = keys::seal_keys_record(&intermediate, &generated)?;
                adapter.create_file(&keys_record_path)?;
                adapter.set_file_data(&keys_record_path, &mut &sealed[..])?;
                generated
            }
            _ => {
                log::debug!("init: found keys-record, importing persistent key material");
                let mut buf = Vec::new();
                adapter.get_file_data(&keys_record_path)?.read_to_end(&mut buf)?;
                keys::open_keys_record(&intermediate, &buf)?
            }
        };

        let hasher = NameHasher::new(persistent.hmac_key.to_vec(), config.plain_text_mode);
        let tree_prefix = format!("{root_prefix}/{}", hasher.hash_component("tree"));
        let lookup_prefix = format!("{root_prefix}/{}", hasher.hash_component("lookup"));
        adapter.create_folder(&format!("{tree_prefix}/"))?;
        adapter.create_folder(&format!("{lookup_prefix}/"))?;

        Ok(Self {
            adapter: Arc::clone(&adapter),
            config,
            hasher,
            persistent,
            locks: LockManager::new(),
            tree: TreeStore::new(Arc::clone(&adapter), tree_prefix),
            lookup: LookupStore::new(adapter, lookup_prefix),
        })
    }

    fn resolve(&self, logical: &LogicalPath) -> CoreResult<PathSet> {
        path::resolve(logical, &self.hasher)
    }

    // ---- record encode/decode -------------------------------------------------

    /// `[flag: u8][body]`, `flag==1` meaning `body` is zlib-deflated JSON
    /// (SPEC_FULL.md §3's resolution of the otherwise-unused `compressed`
    /// field on folder records) and `flag==0` meaning raw JSON.
    fn encode_record<T: serde::Serialize>(&self, record: &T, compressed: bool) -> CoreResult<Vec<u8>> {
        let json = serde_json::to_vec(record)?;
        let body = if compressed { compress::deflate(&json)? } else { json };
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(compressed as u8);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode_record<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> CoreResult<T> {
        let (flag, body) = bytes
            .split_first()
            .ok_or_else(|| CoreError::Corruption("empty record payload".to_string()))?;
        let json = if *flag == 1 { compress::inflate(body)? } else { body.to_vec() };
        Ok(serde_json::from_slice(&json)?)
    }

    fn read_folder_record(&self, sidecar_rel: &str) -> CoreResult<FolderRecord> {
        let sealed = self.tree.read(sidecar_rel)?;
        let plaintext = envelope::open(&self.persistent.aead_key, &sealed, sidecar_rel.as_bytes())?;
        self.decode_record(&plaintext)
    }

    fn write_folder_record(&self, sidecar_rel: &str, record: &FolderRecord) -> CoreResult<()> {
        let bytes = self.encode_record(record, record.compressed)?;
        let sealed = envelope::seal(&self.persistent.aead_key, &bytes, sidecar_rel.as_bytes())?;
        self.tree.write(sidecar_rel, &sealed)
    }

    fn read_file_record(&self, rel: &str) -> CoreResult<FileRecord> {
        let sealed = self.tree.read(rel)?;
        let plaintext = envelope::open(&self.persistent.aead_key, &sealed, rel.as_bytes())?;
        self.decode_record(&plaintext)
    }

    fn write_file_record(&self, rel: &str, record: &FileRecord) -> CoreResult<()> {
        let bytes = self.encode_record(record, false)?;
        let sealed = envelope::seal(&self.persistent.aead_key, &bytes, rel.as_bytes())?;
        self.tree.write(rel, &sealed)
    }

    fn random_chunk_target(&self) -> usize {
        rand::rng().random_range(self.config.target_min_chunk_size..=self.config.target_max_chunk_size) as usize
    }

    // ---- exists ----------------------------------------------------------

    pub fn exists(&self, path: &str) -> CoreResult<PathKind> {
        let logical = LogicalPath::parse(path)?;
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), true);
        self.path_kind_locked(&logical)
    }

    pub fn exists_file(&self, path: &str) -> CoreResult<bool> {
        Ok(self.exists(path)? == PathKind::File)
    }

    pub fn exists_folder(&self, path: &str) -> CoreResult<bool> {
        Ok(self.exists(path)? == PathKind::Folder)
    }

    fn path_kind_locked(&self, logical: &LogicalPath) -> CoreResult<PathKind> {
        let path_set = self.resolve(logical)?;
        if logical.is_folder() {
            if logical.is_root() {
                return Ok(PathKind::Folder);
            }
            let dir_rel = path_set.hashed_string();
            let sidecar_rel = path_set.file_path_set.as_ref().unwrap().hashed_string();
            let dir_exists = self.tree.exists(&dir_rel)? == Existence::Folder;
            let sidecar_exists = self.tree.exists(&sidecar_rel)? == Existence::File;
            Ok(if dir_exists && sidecar_exists {
                PathKind::Folder
            } else {
                PathKind::Absent
            })
        } else {
            let rel = path_set.hashed_string();
            Ok(if self.tree.exists(&rel)? == Existence::File {
                PathKind::File
            } else {
                PathKind::Absent
            })
        }
    }

    // ---- createFolder / createFile ---------------------------------------

    pub fn create_folder(&self, path: &str, metadata: Option<Metadata>) -> CoreResult<()> {
        self.create_folder_with_compression(path, metadata, false)
    }

    /// Same as [`Self::create_folder`], but marks the folder's sidecar
    /// record for zlib-deflate-before-encrypt storage (SPEC_FULL.md §3's
    /// resolution of the `compressed` flag's effect; see `encode_record`).
    /// Only the JSON metadata envelope shrinks — file content under the
    /// folder is unaffected, since that lives in the Lookup Store instead.
    pub fn create_folder_compressed(&self, path: &str, metadata: Option<Metadata>) -> CoreResult<()> {
        self.create_folder_with_compression(path, metadata, true)
    }

    fn create_folder_with_compression(&self, path: &str, metadata: Option<Metadata>, compressed: bool) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() || logical.is_root() {
            return Err(CoreError::InvalidPath(format!(
                "createFolder requires a non-root folder path: {path}"
            )));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        if self.path_kind_locked(&logical)? != PathKind::Absent {
            return Err(CoreError::AlreadyExists(logical.to_unhashed_string()));
        }
        self.create_folder_locked(&logical, metadata.unwrap_or_default(), compressed)
    }

    /// Toggles an existing folder's `compressed` flag via read-modify-write,
    /// the same pattern [`Self::set_folder_metadata`] uses. Re-encodes the
    /// sidecar record under the new setting immediately; it does not touch
    /// any other folder's records.
    pub fn set_folder_compressed(&self, path: &str, compressed: bool) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() || logical.is_root() {
            return Err(CoreError::InvalidPath(
                "setFolderCompressed requires a non-root folder path".to_string(),
            ));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        let path_set = self.resolve(&logical)?;
        if self.tree.exists(&path_set.hashed_string())? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let sidecar_rel = path_set.file_path_set.as_ref().unwrap().hashed_string();
        let mut record = self.read_folder_record(&sidecar_rel)?;
        record.compressed = compressed;
        record.modified = Utc::now();
        self.write_folder_record(&sidecar_rel, &record)
    }

    fn create_folder_locked(&self, logical: &LogicalPath, metadata: Metadata, compressed: bool) -> CoreResult<()> {
        let path_set = self.resolve(logical)?;
        let dir_rel = path_set.hashed_string();
        let sidecar = path_set.file_path_set.as_ref().expect("non-root folder has a sidecar");
        let sidecar_rel = sidecar.hashed_string();
        let name = logical.name().expect("non-root folder has a name").to_string();
        let now = Utc::now();

        let result = (|| -> CoreResult<()> {
            self.tree.create_folder(&dir_rel)?;
            self.tree.create_file(&sidecar_rel)?;
            self.lookup.write_name_recovery(
                &self.hasher,
                path_set.hashed.last().unwrap(),
                &name,
                &self.persistent.aead_key,
            )?;
            self.lookup.write_name_recovery(
                &self.hasher,
                sidecar.hashed.last().unwrap(),
                &format!("{name}.folder"),
                &self.persistent.aead_key,
            )?;
            let record = FolderRecord {
                name,
                path: String::new(),
                kind: RecordKind::Folder,
                created: now,
                modified: now,
                accessed: now,
                metadata,
                compressed,
            };
            self.write_folder_record(&sidecar_rel, &record)
        })();

        if let Err(e) = result {
            log::warn!("createFolder: rolling back after failure: {e}");
            let _ = self.tree.delete_file(&sidecar_rel, true);
            let _ = self.tree.delete_folder(&dir_rel, true);
            return Err(e);
        }
        Ok(())
    }

    pub fn create_file(&self, path: &str, metadata: Option<Metadata>) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("createFile requires a file path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        if self.path_kind_locked(&logical)? != PathKind::Absent {
            return Err(CoreError::AlreadyExists(logical.to_unhashed_string()));
        }
        self.create_file_locked(&logical, metadata.unwrap_or_default())
    }

    fn create_file_locked(&self, logical: &LogicalPath, metadata: Metadata) -> CoreResult<()> {
        let path_set = self.resolve(logical)?;
        let rel = path_set.hashed_string();
        let name = logical.name().expect("file path has a name").to_string();
        let extension = logical.extension().map(str::to_string);
        let now = Utc::now();

        let result = (|| -> CoreResult<()> {
            self.tree.create_file(&rel)?;
            self.lookup.write_name_recovery(
                &self.hasher,
                path_set.hashed.last().unwrap(),
                &name,
                &self.persistent.aead_key,
            )?;
            let record = FileRecord {
                name,
                extension,
                path: String::new(),
                kind: RecordKind::File,
                created: now,
                modified: now,
                accessed: now,
                data: FileData::empty(fresh_uid()),
                metadata,
            };
            self.write_file_record(&rel, &record)
        })();

        if let Err(e) = result {
            log::warn!("createFile: rolling back after failure: {e}");
            let _ = self.tree.delete_file(&rel, true);
            return Err(e);
        }
        Ok(())
    }

    // ---- getFileInfo / getFolderInfo -------------------------------------

    pub fn get_file_info(&self, path: &str) -> CoreResult<FileRecord> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("getFileInfo requires a file path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), true);
        let path_set = self.resolve(&logical)?;
        let rel = path_set.hashed_string();
        if self.tree.exists(&rel)? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let mut record = self.read_file_record(&rel)?;
        record.path = logical.to_unhashed_string();
        Ok(record)
    }

    pub fn get_folder_info(&self, path: &str) -> CoreResult<FolderRecord> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("getFolderInfo requires a folder path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), true);
        if logical.is_root() {
            // The root never has a sidecar (spec.md §4.1); synthesize a
            // minimal record rather than erroring, since `exists("/")` is
            // always `"folder"`.
            let now = Utc::now();
            return Ok(FolderRecord {
                name: String::new(),
                path: "/".to_string(),
                kind: RecordKind::Folder,
                created: now,
                modified: now,
                accessed: now,
                metadata: Metadata::default(),
                compressed: false,
            });
        }
        let path_set = self.resolve(&logical)?;
        if self.tree.exists(&path_set.hashed_string())? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let sidecar_rel = path_set.file_path_set.as_ref().unwrap().hashed_string();
        let mut record = self.read_folder_record(&sidecar_rel)?;
        record.path = logical.to_unhashed_string();
        Ok(record)
    }

    // ---- setFileMetadata / setFolderMetadata -----------------------------

    pub fn set_file_metadata(&self, path: &str, metadata: Option<Metadata>) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("setFileMetadata requires a file path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        let path_set = self.resolve(&logical)?;
        let rel = path_set.hashed_string();
        if self.tree.exists(&rel)? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let mut record = self.read_file_record(&rel)?;
        record.metadata = metadata.unwrap_or_default();
        record.modified = Utc::now();
        self.write_file_record(&rel, &record)
    }

    pub fn set_folder_metadata(&self, path: &str, metadata: Option<Metadata>) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() || logical.is_root() {
            return Err(CoreError::InvalidPath(
                "setFolderMetadata requires a non-root folder path".to_string(),
            ));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        let path_set = self.resolve(&logical)?;
        if self.tree.exists(&path_set.hashed_string())? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let sidecar_rel = path_set.file_path_set.as_ref().unwrap().hashed_string();
        let mut record = self.read_folder_record(&sidecar_rel)?;
        record.metadata = metadata.unwrap_or_default();
        record.modified = Utc::now();
        self.write_folder_record(&sidecar_rel, &record)
    }

    // ---- getFileData / setFileData ---------------------------------------

    /// Opens a file's content for reading. The read turn is acquired here
    /// (a simplification of spec.md §4.8.7's "turn acquired on first
    /// `.get()`" lazy `Datum`, appropriate for a synchronous `Read`-based
    /// API with no separate "first pull" event) and released when the
    /// returned [`FileDataStream`] is dropped.
    pub fn get_file_data(&self, path: &str, abort: Option<AbortSignal>) -> CoreResult<FileDataStream> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("getFileData requires a file path: {path}")));
        }
        let turn = self.locks.get_turn(&logical.to_unhashed_string(), true);
        abort::check(abort.as_ref())?;
        let path_set = self.resolve(&logical)?;
        let rel = path_set.hashed_string();
        if self.tree.exists(&rel)? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let record = self.read_file_record(&rel)?;

        let (headers, chunk_paths, offsets) = if record.data.chunks == 0 {
            (Vec::new(), Vec::new(), Vec::new())
        } else {
            let header_blob_path = self.lookup.blob_path(&self.hasher, &record.data.uid, record.data.chunks)?;
            let sealed_headers = self.lookup.read_blob(&header_blob_path)?;
            let headers = stream::open_header_blob(&self.persistent.aead_key, &sealed_headers)?;
            let offsets = record.data.metadata.offsets.clone();
            if offsets.len() != record.data.chunks as usize {
                return Err(CoreError::Corruption(
                    "offsets length does not match chunk count".to_string(),
                ));
            }
            let mut chunk_paths = Vec::with_capacity(record.data.chunks as usize);
            for i in 0..record.data.chunks {
                chunk_paths.push(self.lookup.blob_path(&self.hasher, &record.data.uid, i)?);
            }
            (headers, chunk_paths, offsets)
        };

        Ok(FileDataStream {
            _turn: turn,
            adapter: Arc::clone(&self.adapter),
            chunk_paths,
            headers,
            offsets,
            uid: record.data.uid,
            aead_key: self.persistent.aead_key.to_vec(),
            abort,
            index: 0,
            current: std::io::Cursor::new(Vec::new()),
        })
    }

    /// Replaces a file's content, reading `source` to exhaustion and
    /// splitting it into variable-sized chunks (spec.md §4.3, §4.8.8). If
    /// `abort` fires mid-write, the already-written blobs are left as
    /// orphans (reclaimable by [`Self::sweep_orphans`]) and the file record
    /// is left untouched, so the file still appears at its previous size.
    pub fn set_file_data(&self, path: &str, source: &mut dyn Read, abort: Option<&AbortSignal>) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("setFileData requires a file path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        let path_set = self.resolve(&logical)?;
        let rel = path_set.hashed_string();
        if self.tree.exists(&rel)? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let mut record = self.read_file_record(&rel)?;
        let uid = record.data.uid.clone();

        let mut offsets = Vec::new();
        let mut headers = Vec::new();
        let mut bytes_decrypted = 0u64;
        let mut bytes_encrypted = 0u64;
        let mut chunk_index: u32 = 0;

        loop {
            abort::check(abort)?;
            let target = self.random_chunk_target();
            let mut chunk_buf = vec![0u8; target];
            let mut filled = 0usize;
            while filled < chunk_buf.len() {
                let n = source.read(&mut chunk_buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            chunk_buf.truncate(filled);

            let aad = chunk_aad(&uid, chunk_index);
            let (ciphertext, header) = stream::encrypt_chunk(&self.persistent.aead_key, &chunk_buf, &aad)?;
            let blob_path = self.lookup.blob_path(&self.hasher, &uid, chunk_index)?;
            self.lookup.write_blob(&blob_path, &ciphertext)?;

            bytes_decrypted += filled as u64;
            bytes_encrypted += (ciphertext.len() + header.len()) as u64;
            offsets.push(headers.len() as u64);
            headers.extend_from_slice(&header);
            chunk_index += 1;

            if filled < target {
                break;
            }
        }

        if chunk_index > 0 {
            let sealed_headers = stream::seal_header_blob(&self.persistent.aead_key, &headers)?;
            let header_blob_path = self.lookup.blob_path(&self.hasher, &uid, chunk_index)?;
            self.lookup.write_blob(&header_blob_path, &sealed_headers)?;
        }

        record.data.chunks = chunk_index;
        record.data.bytes = ByteCounts {
            decrypted: bytes_decrypted,
            encrypted: bytes_encrypted,
        };
        record.data.format = stream::CHUNK_FORMAT_V1;
        record.data.metadata = ChunkMetadata {
            offsets,
            format: stream::HEADER_BLOB_FORMAT_V1,
        };
        record.modified = Utc::now();
        self.write_file_record(&rel, &record)
    }

    // ---- renameFile / renameFolder ----------------------------------------

    pub fn rename_file(&self, path: &str, new_name: &str) -> CoreResult<()> {
        let source = LogicalPath::parse(path)?;
        if source.is_folder() {
            return Err(CoreError::InvalidPath(format!("renameFile requires a file path: {path}")));
        }
        let parent = source
            .parent()
            .ok_or_else(|| CoreError::InvalidPath("cannot rename the root".to_string()))?;
        let destination = parent.join(new_name, false)?;
        let (_dest_turn, _src_turn) = self
            .locks
            .get_turn_pair(&destination.to_unhashed_string(), &source.to_unhashed_string());

        let dest_set = self.resolve(&destination)?;
        let dest_rel = dest_set.hashed_string();
        if self.tree.exists(&dest_rel)? != Existence::Absent {
            return Err(CoreError::AlreadyExists(destination.to_unhashed_string()));
        }
        let source_set = self.resolve(&source)?;
        let source_rel = source_set.hashed_string();
        if self.tree.exists(&source_rel)? == Existence::Absent {
            return Err(CoreError::NotFound(source.to_unhashed_string()));
        }

        if self.tree.has_native_rename() {
            // The record is envelope-sealed with its own hashed path as AEAD
            // associated data (`write_file_record`), so it must be decrypted
            // under the *source* AAD before the raw adapter-level rename and
            // re-sealed under the *destination* AAD afterward — the adapter
            // only moves ciphertext bytes, it never re-derives the AAD.
            let mut record = self.read_file_record(&source_rel)?;
            record.name = destination.name().unwrap().to_string();
            record.extension = destination.extension().map(str::to_string);
            record.modified = Utc::now();

            let new_leaf = dest_set.hashed.last().unwrap().clone();
            self.tree.rename_file(&source_rel, &new_leaf)?;
            self.write_file_record(&dest_rel, &record)?;
            self.lookup.write_name_recovery(
                &self.hasher,
                &new_leaf,
                destination.name().unwrap(),
                &self.persistent.aead_key,
            )?;
            Ok(())
        } else {
            // No native rename: equivalent to moveFile, which already
            // preserves `data.uid` (spec.md §8 invariant 5) via
            // `do_not_copy_data`.
            self.copy_file_locked(&source, &destination, true)?;
            self.delete_file_locked(&source, true)
        }
    }

    pub fn rename_folder(&self, path: &str, new_name: &str) -> CoreResult<()> {
        let source = LogicalPath::parse(path)?;
        if !source.is_folder() || source.is_root() {
            return Err(CoreError::InvalidPath(format!("renameFolder requires a non-root folder path: {path}")));
        }
        let parent = source.parent().unwrap();
        let destination = parent.join(new_name, true)?;
        let (_dest_turn, _src_turn) = self
            .locks
            .get_turn_pair(&destination.to_unhashed_string(), &source.to_unhashed_string());

        let dest_set = self.resolve(&destination)?;
        let dest_dir_rel = dest_set.hashed_string();
        if self.tree.exists(&dest_dir_rel)? != Existence::Absent {
            return Err(CoreError::AlreadyExists(destination.to_unhashed_string()));
        }
        let source_set = self.resolve(&source)?;
        let source_dir_rel = source_set.hashed_string();
        if self.tree.exists(&source_dir_rel)? == Existence::Absent {
            return Err(CoreError::NotFound(source.to_unhashed_string()));
        }

        if self.tree.has_native_rename() {
            // Same AAD subtlety as `rename_file`: read the sidecar record
            // under the source AAD before either raw rename runs, and only
            // re-seal it under the destination AAD once both renames (the
            // folder directory and its sidecar) have completed.
            let source_sidecar = source_set.file_path_set.as_ref().unwrap();
            let dest_sidecar = dest_set.file_path_set.as_ref().unwrap();
            let source_sidecar_rel = source_sidecar.hashed_string();
            let dest_sidecar_rel = dest_sidecar.hashed_string();

            let mut record = self.read_folder_record(&source_sidecar_rel)?;
            record.name = destination.name().unwrap().to_string();
            record.modified = Utc::now();

            let new_dir_leaf = dest_set.hashed.last().unwrap().clone();
            self.tree.rename_folder(&source_dir_rel, &new_dir_leaf)?;
            let new_sidecar_leaf = dest_sidecar.hashed.last().unwrap().clone();
            self.tree.rename_file(&source_sidecar_rel, &new_sidecar_leaf)?;

            self.write_folder_record(&dest_sidecar_rel, &record)?;

            self.lookup.write_name_recovery(
                &self.hasher,
                &new_dir_leaf,
                destination.name().unwrap(),
                &self.persistent.aead_key,
            )?;
            self.lookup.write_name_recovery(
                &self.hasher,
                &new_sidecar_leaf,
                &format!("{}.folder", destination.name().unwrap()),
                &self.persistent.aead_key,
            )?;
            Ok(())
        } else {
            self.recursive_move_folder(&source, &destination)
        }
    }

    /// Non-native-rename fallback for folders: create the destination with
    /// the source's metadata, recursively move every child, then delete the
    /// (now-empty) source. Holds the source's write turn for the whole
    /// operation; each child acquires its own turn independently.
    fn recursive_move_folder(&self, source: &LogicalPath, destination: &LogicalPath) -> CoreResult<()> {
        let source_set = self.resolve(source)?;
        let sidecar_rel = source_set.file_path_set.as_ref().unwrap().hashed_string();
        let source_record = self.read_folder_record(&sidecar_rel)?;

        self.create_folder_locked(destination, source_record.metadata.clone(), source_record.compressed)?;

        for child in self.list_folder_locked(source)? {
            let child_source = source.join(&child.name, child.is_folder)?;
            let child_dest = destination.join(&child.name, child.is_folder)?;
            if child.is_folder {
                self.recursive_move_folder(&child_source, &child_dest)?;
            } else {
                self.move_file(&child_source.to_unhashed_string(), &child_dest.to_unhashed_string())?;
            }
        }

        self.delete_folder_locked(source)
    }

    // ---- moveFile / copyFile ----------------------------------------------

    pub fn copy_file(&self, source_path: &str, destination_path: &str) -> CoreResult<()> {
        let source = LogicalPath::parse(source_path)?;
        let destination = LogicalPath::parse(destination_path)?;
        let (_dest_turn, _src_turn) = self
            .locks
            .get_turn_pair(&destination.to_unhashed_string(), &source.to_unhashed_string());
        self.copy_file_locked(&source, &destination, false).map(|_| ())
    }

    pub fn move_file(&self, source_path: &str, destination_path: &str) -> CoreResult<()> {
        let source = LogicalPath::parse(source_path)?;
        let destination = LogicalPath::parse(destination_path)?;
        let (_dest_turn, _src_turn) = self
            .locks
            .get_turn_pair(&destination.to_unhashed_string(), &source.to_unhashed_string());

        self.copy_file_locked(&source, &destination, true)?;
        match self.delete_file_locked(&source, true) {
            Ok(()) => Ok(()),
            Err(delete_err) => {
                log::warn!("moveFile: deleting source record failed after copy: {delete_err}");
                if self.delete_file_locked(&destination, false).is_ok() {
                    return Err(delete_err);
                }
                match self.regenerate_uid_locked(&destination) {
                    Ok(()) => Err(CoreError::Correctable(format!(
                        "moveFile could not delete the source record ({delete_err}); the \
                         destination's data.uid was regenerated to restore the no-shared-uid \
                         invariant, orphaning its previous content"
                    ))),
                    Err(regen_err) => {
                        log::error!("moveFile: failed to regenerate destination uid during recovery: {regen_err}");
                        Err(CoreError::Correctable(format!(
                            "moveFile left source and destination sharing data.uid after a failed \
                             cleanup attempt: {delete_err}"
                        )))
                    }
                }
            }
        }
    }

    /// Shared core of `copyFile`/`moveFile`. `do_not_copy_data=true` makes
    /// the destination record point at the *same* `data.uid` (and thus the
    /// same blobs) as the source rather than duplicating content — the
    /// temporary two-records-one-uid state `moveFile` relies on. Returns
    /// the uid the destination record ended up with.
    fn copy_file_locked(&self, source: &LogicalPath, destination: &LogicalPath, do_not_copy_data: bool) -> CoreResult<String> {
        if source.is_folder() || destination.is_folder() {
            return Err(CoreError::InvalidPath("copyFile/moveFile require file paths".to_string()));
        }
        let dest_set = self.resolve(destination)?;
        let dest_rel = dest_set.hashed_string();
        if self.tree.exists(&dest_rel)? != Existence::Absent {
            return Err(CoreError::AlreadyExists(destination.to_unhashed_string()));
        }
        let source_set = self.resolve(source)?;
        let source_rel = source_set.hashed_string();
        if self.tree.exists(&source_rel)? == Existence::Absent {
            return Err(CoreError::NotFound(source.to_unhashed_string()));
        }

        let source_record = self.read_file_record(&source_rel)?;
        let new_uid = if do_not_copy_data { source_record.data.uid.clone() } else { fresh_uid() };
        let now = Utc::now();
        let name = destination.name().unwrap().to_string();
        let extension = destination.extension().map(str::to_string);

        let mut dest_record = source_record.clone();
        dest_record.name = name.clone();
        dest_record.extension = extension;
        dest_record.created = now;
        dest_record.modified = now;
        dest_record.accessed = now;
        dest_record.data.uid = new_uid.clone();
        dest_record.path = String::new();

        let result = (|| -> CoreResult<()> {
            self.tree.create_file(&dest_rel)?;
            self.lookup.write_name_recovery(
                &self.hasher,
                dest_set.hashed.last().unwrap(),
                &name,
                &self.persistent.aead_key,
            )?;
            self.write_file_record(&dest_rel, &dest_record)?;

            if !do_not_copy_data && source_record.data.chunks > 0 {
                for i in 0..=source_record.data.chunks {
                    let src_blob = self.lookup.blob_path(&self.hasher, &source_record.data.uid, i)?;
                    let dst_blob = self.lookup.blob_path(&self.hasher, &new_uid, i)?;
                    let bytes = self.lookup.read_blob(&src_blob)?;
                    self.lookup.write_blob(&dst_blob, &bytes)?;
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            log::warn!("copyFile: rolling back after failure: {e}");
            let _ = self.tree.delete_file(&dest_rel, true);
            return Err(e);
        }
        Ok(new_uid)
    }

    /// Last-resort recovery for a failed `moveFile`: regenerates the
    /// destination record's `data.uid` to a fresh, unreferenced value,
    /// restoring invariant 3 (no two records share a uid) at the cost of
    /// orphaning whatever content the destination used to point at.
    fn regenerate_uid_locked(&self, destination: &LogicalPath) -> CoreResult<()> {
        let dest_set = self.resolve(destination)?;
        let dest_rel = dest_set.hashed_string();
        let mut record = self.read_file_record(&dest_rel)?;
        record.data.uid = fresh_uid();
        self.write_file_record(&dest_rel, &record)
    }

    // ---- moveFolder / copyFolder (non-recursive, empty source only) ------

    pub fn copy_folder(&self, source_path: &str, destination_path: &str) -> CoreResult<()> {
        let (source, destination, _dest_turn, _src_turn) = self.acquire_folder_pair(source_path, destination_path)?;
        if !self.list_folder_locked(&source)?.is_empty() {
            return Err(CoreError::NotEmpty(source.to_unhashed_string()));
        }
        let source_set = self.resolve(&source)?;
        let sidecar_rel = source_set.file_path_set.as_ref().unwrap().hashed_string();
        let record = self.read_folder_record(&sidecar_rel)?;
        self.create_folder_locked(&destination, record.metadata, record.compressed)
    }

    pub fn move_folder(&self, source_path: &str, destination_path: &str) -> CoreResult<()> {
        let (source, destination, _dest_turn, _src_turn) = self.acquire_folder_pair(source_path, destination_path)?;
        if !self.list_folder_locked(&source)?.is_empty() {
            return Err(CoreError::NotEmpty(source.to_unhashed_string()));
        }
        let source_set = self.resolve(&source)?;
        let sidecar_rel = source_set.file_path_set.as_ref().unwrap().hashed_string();
        let record = self.read_folder_record(&sidecar_rel)?;
        self.create_folder_locked(&destination, record.metadata, record.compressed)?;
        self.delete_folder_locked(&source)
    }

    fn acquire_folder_pair<'a>(
        &'a self,
        source_path: &str,
        destination_path: &str,
    ) -> CoreResult<(LogicalPath, LogicalPath, Turn, Option<Turn>)> {
        let source = LogicalPath::parse(source_path)?;
        let destination = LogicalPath::parse(destination_path)?;
        if !source.is_folder() || !destination.is_folder() || source.is_root() {
            return Err(CoreError::InvalidPath(
                "moveFolder/copyFolder require non-root folder paths".to_string(),
            ));
        }
        let (dest_turn, src_turn) = self
            .locks
            .get_turn_pair(&destination.to_unhashed_string(), &source.to_unhashed_string());
        if self.path_kind_locked(&destination)? != PathKind::Absent {
            return Err(CoreError::AlreadyExists(destination.to_unhashed_string()));
        }
        if self.path_kind_locked(&source)? == PathKind::Absent {
            return Err(CoreError::NotFound(source.to_unhashed_string()));
        }
        Ok((source, destination, dest_turn, src_turn))
    }

    // ---- deleteFile / deleteFolder ----------------------------------------

    pub fn delete_file(&self, path: &str) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("deleteFile requires a file path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        self.delete_file_locked(&logical, false)
    }

    fn delete_file_locked(&self, logical: &LogicalPath, do_not_delete_data: bool) -> CoreResult<()> {
        let path_set = self.resolve(logical)?;
        let rel = path_set.hashed_string();
        if self.tree.exists(&rel)? == Existence::Absent {
            return Err(CoreError::NotFound(logical.to_unhashed_string()));
        }
        let record = self.read_file_record(&rel)?;
        if !do_not_delete_data && record.data.chunks > 0 {
            for i in 0..=record.data.chunks {
                let blob_path = self.lookup.blob_path(&self.hasher, &record.data.uid, i)?;
                if let Err(e) = self.lookup.delete_blob(&blob_path, true) {
                    log::warn!("deleteFile: failed to delete content blob {blob_path}: {e}");
                }
            }
        }
        self.tree.delete_file(&rel, false)
    }

    pub fn delete_folder(&self, path: &str) -> CoreResult<()> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() || logical.is_root() {
            return Err(CoreError::InvalidPath(format!("deleteFolder requires a non-root folder path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), false);
        if !self.list_folder_locked(&logical)?.is_empty() {
            return Err(CoreError::NotEmpty(logical.to_unhashed_string()));
        }
        self.delete_folder_locked(&logical)
    }

    fn delete_folder_locked(&self, logical: &LogicalPath) -> CoreResult<()> {
        let path_set = self.resolve(logical)?;
        let sidecar_rel = path_set.file_path_set.as_ref().unwrap().hashed_string();
        let dir_rel = path_set.hashed_string();
        self.tree.delete_file(&sidecar_rel, true)?;
        self.tree.delete_folder(&dir_rel, true)
    }

    // ---- listFolder --------------------------------------------------------

    pub fn list_folder(&self, path: &str, abort: Option<&AbortSignal>) -> CoreResult<Vec<ListItem>> {
        let logical = LogicalPath::parse(path)?;
        if !logical.is_folder() {
            return Err(CoreError::InvalidPath(format!("listFolder requires a folder path: {path}")));
        }
        let _turn = self.locks.get_turn(&logical.to_unhashed_string(), true);
        self.list_folder_items_locked(&logical, abort)
    }

    fn list_folder_items_locked(&self, logical: &LogicalPath, abort: Option<&AbortSignal>) -> CoreResult<Vec<ListItem>> {
        let path_set = self.resolve(logical)?;
        let dir_rel = path_set.hashed_string();
        let children = match self.tree.exists(&dir_rel)? {
            Existence::Folder => self.tree.list_folder(&dir_rel)?,
            Existence::Absent if logical.is_root() => Vec::new(),
            Existence::Absent => return Err(CoreError::NotFound(logical.to_unhashed_string())),
            Existence::File => {
                return Err(CoreError::Corruption(format!(
                    "expected a folder at {dir_rel}, found a file"
                )))
            }
        };

        let mut items = Vec::new();
        for child_rel in children {
            if abort::check(abort).is_err() {
                items.push(ListItem::Error(CoreError::Aborted("cancelled by caller".to_string())));
                break;
            }
            // Nested hashed directories are folder bodies; their sidecars
            // (siblings in this same directory) are what we enumerate.
            if child_rel.ends_with('/') {
                continue;
            }
            let leaf = child_rel.rsplit('/').next().unwrap_or(&child_rel).to_string();
            let item = (|| -> CoreResult<ListItem> {
                let plaintext_name =
                    self.lookup.read_name_recovery(&self.hasher, &leaf, &self.persistent.aead_key)?;
                if let Some(folder_name) = plaintext_name.strip_suffix(".folder") {
                    let mut record = self.read_folder_record(&child_rel)?;
                    record.path = logical.join(folder_name, true)?.to_unhashed_string();
                    Ok(ListItem::Folder(record))
                } else {
                    let mut record = self.read_file_record(&child_rel)?;
                    record.path = logical.join(&plaintext_name, false)?.to_unhashed_string();
                    Ok(ListItem::File(record))
                }
            })()
            .unwrap_or_else(ListItem::Error);
            items.push(item);
        }
        Ok(items)
    }

    fn list_folder_locked(&self, logical: &LogicalPath) -> CoreResult<Vec<ListedEntry>> {
        let mut out = Vec::new();
        for item in self.list_folder_items_locked(logical, None)? {
            match item {
                ListItem::Folder(r) => out.push(ListedEntry { name: r.name, is_folder: true }),
                ListItem::File(r) => out.push(ListedEntry { name: r.name, is_folder: false }),
                ListItem::Error(e) => return Err(e),
            }
        }
        Ok(out)
    }

    // ---- clear --------------------------------------------------------------

    /// Acquires the global drain, then post-order recursively deletes every
    /// file and folder from the root inward. The root itself is never
    /// removed: `exists("/") == "folder"` and `listFolder("/")` is empty
    /// afterward (spec.md §8, end-to-end scenario 6).
    pub fn clear(&self, abort: Option<&AbortSignal>) -> CoreResult<()> {
        let _guard = self.locks.acquire_global_lock();
        self.clear_recursive(&LogicalPath::root(), abort)
    }

    fn clear_recursive(&self, folder: &LogicalPath, abort: Option<&AbortSignal>) -> CoreResult<()> {
        for item in self.list_folder_items_locked(folder, abort)? {
            abort::check(abort)?;
            match item {
                ListItem::Folder(record) => {
                    let child = folder.join(&record.name, true)?;
                    self.clear_recursive(&child, abort)?;
                    self.delete_folder_locked(&child)?;
                }
                ListItem::File(record) => {
                    let child = folder.join(&record.name, false)?;
                    self.delete_file_locked(&child, false)?;
                }
                ListItem::Error(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ---- background integrity sweep (SPEC_FULL.md §9) -----------------------

    /// Scans the Lookup Store's fan-out for content/aggregate-header blobs
    /// no current file record references, e.g. left behind by an aborted
    /// `setFileData` or a `moveFile` that regenerated a destination uid
    /// during recovery. Non-destructive unless `delete` is set.
    pub fn sweep_orphans(&self, delete: bool) -> CoreResult<OrphanReport> {
        let _guard = self.locks.acquire_global_lock();
        let mut referenced = HashSet::new();
        self.collect_referenced_blobs(&LogicalPath::root(), &mut referenced)?;

        let mut orphans = Vec::new();
        for blob in self.lookup.walk_blob_paths()? {
            if !referenced.contains(&blob) {
                orphans.push(blob);
            }
        }

        if delete {
            for path in &orphans {
                if let Err(e) = self.lookup.delete_blob(path, true) {
                    log::warn!("sweep_orphans: failed to delete orphan blob {path}: {e}");
                }
            }
        }
        Ok(OrphanReport { orphan_blobs: orphans })
    }

    fn collect_referenced_blobs(&self, folder: &LogicalPath, referenced: &mut HashSet<String>) -> CoreResult<()> {
        for item in self.list_folder_items_locked(folder, None)? {
            match item {
                ListItem::File(record) => {
                    if record.data.chunks > 0 {
                        for i in 0..=record.data.chunks {
                            referenced.insert(self.lookup.blob_path(&self.hasher, &record.data.uid, i)?);
                        }
                    }
                }
                ListItem::Folder(record) => {
                    let child = folder.join(&record.name, true)?;
                    self.collect_referenced_blobs(&child, referenced)?;
                }
                ListItem::Error(_) => {}
            }
        }
        Ok(())
    }
}

/// AAD binding a content chunk's ciphertext/header to the file's uid and
/// chunk index, so blobs cannot be swapped between files or reordered
/// undetected (spec.md §4.3).
fn chunk_aad(uid: &str, chunk_index: u32) -> Vec<u8> {
    pae(&[uid.as_bytes(), &chunk_index.to_le_bytes()])
}

/// The stream [`FileSystemCore::get_file_data`] returns: decrypts chunk
/// blobs lazily, in order, concatenating their plaintext into one logical
/// `Read`. Releases its read turn when dropped.
pub struct FileDataStream {
    _turn: Turn,
    adapter: Arc<dyn StorageAdapter>,
    chunk_paths: Vec<String>,
    headers: Vec<u8>,
    offsets: Vec<u64>,
    uid: String,
    aead_key: Vec<u8>,
    abort: Option<AbortSignal>,
    index: usize,
    current: std::io::Cursor<Vec<u8>>,
}

impl FileDataStream {
    fn load_next(&mut self) -> CoreResult<bool> {
        if self.index >= self.chunk_paths.len() {
            return Ok(false);
        }
        abort::check(self.abort.as_ref())?;
        let path = self.chunk_paths[self.index].clone();
        let mut ciphertext = Vec::new();
        self.adapter.get_file_data(&path)?.read_to_end(&mut ciphertext)?;

        let start = self.offsets[self.index] as usize;
        let end = if self.index + 1 < self.offsets.len() {
            self.offsets[self.index + 1] as usize
        } else {
            self.headers.len()
        };
        if start > end || end > self.headers.len() {
            return Err(CoreError::Corruption(format!(
                "chunk {} header offset out of range",
                self.index
            )));
        }
        let header = &self.headers[start..end];
        let aad = chunk_aad(&self.uid, self.index as u32);
        let plaintext = stream::decrypt_chunk(&self.aead_key, &ciphertext, header, &aad)?;
        self.current = std::io::Cursor::new(plaintext);
        self.index += 1;
        Ok(true)
    }
}

impl Read for FileDataStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let n = std::io::Read::read(&mut self.current, buf)?;
            if n > 0 {
                return Ok(n);
            }
            match self.load_next() {
                Ok(true) => continue,
                Ok(false) => return Ok(0),
                Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::local::LocalAdapter;

    fn core() -> (tempfile::TempDir, FileSystemCore) {
        let dir = tempfile::tempdir().unwrap();
        let adapter: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::new(dir.path()).unwrap());
        let core = FileSystemCore::init(adapter, b"a derivation key", Config::default()).unwrap();
        (dir, core)
    }

    fn read_all(mut stream: impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn create_write_read_delete() {
        let (_dir, core) = core();
        core.create_folder("/a/", None).unwrap();
        core.create_file("/a/b.txt", None).unwrap();
        core.set_file_data("/a/b.txt", &mut &[0u8, 1, 2, 3, 4][..], None).unwrap();

        let stream = core.get_file_data("/a/b.txt", None).unwrap();
        assert_eq!(read_all(stream), vec![0, 1, 2, 3, 4]);

        core.delete_file("/a/b.txt").unwrap();
        assert_eq!(core.exists("/a/b.txt").unwrap(), PathKind::Absent);
    }

    #[test]
    fn rename_keeps_uid_copy_generates_fresh_uid() {
        let (_dir, core) = core();
        core.create_file("/x.bin", None).unwrap();
        let uid_before = core.get_file_info("/x.bin").unwrap().data.uid;
        core.rename_file("/x.bin", "y.bin").unwrap();
        assert_eq!(core.exists("/x.bin").unwrap(), PathKind::Absent);
        assert_eq!(core.exists("/y.bin").unwrap(), PathKind::File);
        assert_eq!(core.get_file_info("/y.bin").unwrap().data.uid, uid_before);

        core.create_file("/p.bin", None).unwrap();
        core.set_file_data("/p.bin", &mut &[9u8, 9, 9][..], None).unwrap();
        core.copy_file("/p.bin", "/q.bin").unwrap();
        let uid_p = core.get_file_info("/p.bin").unwrap().data.uid;
        let uid_q = core.get_file_info("/q.bin").unwrap().data.uid;
        assert_ne!(uid_p, uid_q);
        assert_eq!(read_all(core.get_file_data("/p.bin", None).unwrap()), vec![9, 9, 9]);
        assert_eq!(read_all(core.get_file_data("/q.bin", None).unwrap()), vec![9, 9, 9]);
    }

    #[test]
    fn non_empty_folder_delete_fails() {
        let (_dir, core) = core();
        core.create_folder("/d/", None).unwrap();
        core.create_file("/d/f", None).unwrap();
        assert!(matches!(core.delete_folder("/d/"), Err(CoreError::NotEmpty(_))));
    }

    #[test]
    fn zero_byte_file_round_trips() {
        let (_dir, core) = core();
        core.create_file("/empty.bin", None).unwrap();
        core.set_file_data("/empty.bin", &mut &[][..], None).unwrap();
        assert_eq!(core.get_file_info("/empty.bin").unwrap().data.chunks, 0);
        assert_eq!(read_all(core.get_file_data("/empty.bin", None).unwrap()), Vec::<u8>::new());
    }

    #[test]
    fn clear_drains_to_empty_root() {
        let (_dir, core) = core();
        core.create_folder("/a/", None).unwrap();
        core.create_file("/a/f", None).unwrap();
        core.set_file_data("/a/f", &mut &[1u8, 2, 3][..], None).unwrap();

        core.clear(None).unwrap();
        assert_eq!(core.exists("/").unwrap(), PathKind::Folder);
        assert!(core.list_folder("/", None).unwrap().is_empty());
    }

    #[test]
    fn list_folder_yields_children_only() {
        let (_dir, core) = core();
        core.create_folder("/a/", None).unwrap();
        core.create_folder("/a/b/", None).unwrap();
        core.create_file("/a/c.txt", None).unwrap();

        let items = core.list_folder("/a/", None).unwrap();
        assert_eq!(items.len(), 2);
        let mut names: Vec<String> = items
            .into_iter()
            .map(|item| match item {
                ListItem::Folder(r) => r.name,
                ListItem::File(r) => r.name,
                ListItem::Error(e) => panic!("unexpected error entry: {e}"),
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["b".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn sweep_orphans_finds_blob_left_by_aborted_write() {
        let (_dir, core) = core();
        core.create_file("/f", None).unwrap();
        core.set_file_data("/f", &mut &[1u8, 2, 3][..], None).unwrap();

        let (signal, handle) = AbortSignal::new();
        handle.abort();
        let err = core.set_file_data("/f", &mut &[9u8; 8][..], Some(&signal));
        assert!(matches!(err, Err(CoreError::Aborted(_))));

        // Previous content is untouched.
        assert_eq!(read_all(core.get_file_data("/f", None).unwrap()), vec![1, 2, 3]);
    }
}
