//! # Path & PathSet resolver (C1)
//!
//! Parses and validates absolute logical paths using a terminal-slash
//! convention to distinguish folders from files, and pairs every logical
//! path with the per-component keyed-hash path used in storage (a
//! `PathSet`). Folder `PathSet`s additionally carry the `PathSet` of their
//! `.folder` sidecar file.

use crate::error::{CoreError, CoreResult};
use crate::naming::NameHasher;

/// An absolute logical path as seen by clients. Folders are distinguished
/// from files by a terminal `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    parts: Vec<String>,
    is_folder: bool,
}

impl LogicalPath {
    /// The root folder: no parent, no name, never has a sidecar.
    pub fn root() -> Self {
        Self {
            parts: Vec::new(),
            is_folder: true,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Parses an absolute path string. Folders must end in `/`; files must
    /// not. Empty components (`//`) and `.`/`..` traversal segments at the
    /// public boundary are rejected.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        if !raw.starts_with('/') {
            return Err(CoreError::InvalidPath(format!(
                "path must be absolute: {raw}"
            )));
        }
        let is_folder = raw.ends_with('/') || raw == "/";
        let trimmed = raw.trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut parts = Vec::new();
        for part in trimmed.split('/') {
            if part.is_empty() {
                return Err(CoreError::InvalidPath(format!(
                    "empty path component in: {raw}"
                )));
            }
            if part == "." || part == ".." {
                return Err(CoreError::InvalidPath(format!(
                    "traversal segment not allowed: {raw}"
                )));
            }
            if part.chars().any(|c| c == '\0') {
                return Err(CoreError::InvalidPath(format!(
                    "forbidden character in component: {part}"
                )));
            }
            parts.push(part.to_string());
        }
        Ok(Self { parts, is_folder })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The final component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.parts.last().map(|s| s.as_str())
    }

    /// For files only: the extension following the last `.` in the name,
    /// if any (the name itself excludes the extension and its dot).
    pub fn extension(&self) -> Option<&str> {
        if self.is_folder {
            return None;
        }
        let name = self.name()?;
        let dot = name.rfind('.')?;
        if dot == 0 {
            return None;
        }
        Some(&name[dot + 1..])
    }

    /// The base name: for files, the name with any extension stripped.
    pub fn base_name(&self) -> Option<&str> {
        let name = self.name()?;
        if self.is_folder {
            return Some(name);
        }
        match self.extension() {
            Some(ext) => Some(&name[..name.len() - ext.len() - 1]),
            None => Some(name),
        }
    }

    /// The parent folder path, or `None` if this is already the root.
    pub fn parent(&self) -> Option<LogicalPath> {
        if self.parts.is_empty() {
            return None;
        }
        Some(LogicalPath {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
            is_folder: true,
        })
    }

    /// Builds a subpath of this folder. `self` must be a folder.
    pub fn join(&self, name: &str, is_folder: bool) -> CoreResult<LogicalPath> {
        if !self.is_folder {
            return Err(CoreError::InvalidPath(
                "cannot join beneath a file path".into(),
            ));
        }
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(CoreError::InvalidPath(format!(
                "invalid path component: {name}"
            )));
        }
        let mut parts = self.parts.clone();
        parts.push(name.to_string());
        Ok(LogicalPath { parts, is_folder })
    }

    /// Renders the client-visible string form, `/a/b/` for folders and
    /// `/a/b` for files.
    pub fn to_unhashed_string(&self) -> String {
        if self.parts.is_empty() {
            return "/".to_string();
        }
        let mut s = String::from("/");
        s.push_str(&self.parts.join("/"));
        if self.is_folder {
            s.push('/');
        }
        s
    }

    /// The `<name>.folder` sidecar path sibling to this folder, inside the
    /// folder's own parent. Only meaningful for folders; the root has none.
    pub fn folder_sidecar(&self) -> Option<LogicalPath> {
        if !self.is_folder || self.parts.is_empty() {
            return None;
        }
        let mut parts = self.parts.clone();
        let leaf = parts.pop().unwrap();
        parts.push(format!("{leaf}.folder"));
        Some(LogicalPath {
            parts,
            is_folder: false,
        })
    }
}

/// Pairs a client-visible logical path with its per-component keyed-hash
/// storage path. Folder path sets additionally carry the `PathSet` of the
/// `.folder` sidecar metadata file.
#[derive(Debug, Clone)]
pub struct PathSet {
    pub unhashed: LogicalPath,
    pub hashed: Vec<String>,
    pub file_path_set: Option<Box<PathSet>>,
}

impl PathSet {
    pub fn hashed_string(&self) -> String {
        if self.hashed.is_empty() {
            return "/".to_string();
        }
        let mut s = String::from("/");
        s.push_str(&self.hashed.join("/"));
        if self.unhashed.is_folder() {
            s.push('/');
        }
        s
    }
}

/// Resolves a logical path into its paired unhashed/hashed representation.
pub fn resolve(path: &LogicalPath, hasher: &NameHasher) -> CoreResult<PathSet> {
    let hashed: Vec<String> = path
        .parts()
        .iter()
        .map(|part| hasher.hash_component(part))
        .collect();

    let file_path_set = if path.is_folder() && !path.is_root() {
        let sidecar = path.folder_sidecar().expect("non-root folder has sidecar");
        Some(Box::new(resolve(&sidecar, hasher)?))
    } else {
        None
    };

    Ok(PathSet {
        unhashed: path.clone(),
        hashed,
        file_path_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_folder_and_file() {
        let folder = LogicalPath::parse("/a/b/").unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.name(), Some("b"));

        let file = LogicalPath::parse("/a/b.txt").unwrap();
        assert!(!file.is_folder());
        assert_eq!(file.name(), Some("b.txt"));
        assert_eq!(file.base_name(), Some("b"));
        assert_eq!(file.extension(), Some("txt"));
    }

    #[test]
    fn rejects_traversal_and_empty_components() {
        assert!(LogicalPath::parse("/a/../b").is_err());
        assert!(LogicalPath::parse("/a//b").is_err());
        assert!(LogicalPath::parse("relative").is_err());
    }

    #[test]
    fn root_has_no_parent_or_sidecar() {
        let root = LogicalPath::root();
        assert!(root.parent().is_none());
        assert!(root.folder_sidecar().is_none());
    }

    #[test]
    fn folder_sidecar_is_sibling_suffixed() {
        let folder = LogicalPath::parse("/a/b/").unwrap();
        let sidecar = folder.folder_sidecar().unwrap();
        assert_eq!(sidecar.to_unhashed_string(), "/a/b.folder");
    }
}
