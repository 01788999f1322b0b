//! Folder/file record payloads (spec §3, §6.3) — the JSON structures
//! carried inside the envelope-encrypted sidecar files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Metadata = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    pub name: String,
    /// Filled on read from the requested logical path, never persisted as
    /// canonical truth; ignored on deserialization of a freshly read record
    /// and overwritten by the caller.
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub extension: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub data: FileData,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Folder,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileData {
    /// Fresh random identifier, hex-encoded; never shared between two
    /// records present at the same time (invariant 4).
    pub uid: String,
    pub bytes: ByteCounts,
    /// Number of content chunks, excluding the aggregate-header sidecar.
    pub chunks: u32,
    /// Chunk encryption format in use (see `crypto::stream::CHUNK_FORMAT_V1`).
    pub format: u32,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ByteCounts {
    pub decrypted: u64,
    pub encrypted: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte offset of each chunk's encrypted header inside the
    /// aggregate-header blob's plaintext; one past the last offset is the
    /// blob's plaintext length.
    pub offsets: Vec<u64>,
    /// Aggregate-header blob's own outer-encryption format.
    pub format: u32,
}

impl FileData {
    pub fn empty(uid: String) -> Self {
        Self {
            uid,
            bytes: ByteCounts::default(),
            chunks: 0,
            format: 0,
            metadata: ChunkMetadata::default(),
        }
    }
}

pub fn fresh_uid() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut bytes);
    hex::encode(bytes)
}
