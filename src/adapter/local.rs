//! A [`StorageAdapter`] backed directly by `std::fs`, in the same spirit as
//! the teacher's `Cache`: a thin, synchronous wrapper translating hashed
//! paths onto real files and directories under a root. This is the one
//! concrete adapter this crate ships; it exists so the crate is runnable
//! and testable standalone (spec §1's "out of scope" collaborator, made
//! concrete for demonstration).

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::adapter::{Existence, StorageAdapter};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    pub fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let trimmed = path.trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return self.root.clone();
        }
        let mut full = self.root.clone();
        for part in trimmed.split('/') {
            full.push(part);
        }
        full
    }

    fn hashed_path_of(&self, full: &Path) -> String {
        let relative = full.strip_prefix(&self.root).unwrap_or(full);
        let mut s = String::from("/");
        s.push_str(&relative.to_string_lossy().replace('\\', "/"));
        if full.is_dir() {
            s.push('/');
        }
        s
    }
}

impl StorageAdapter for LocalAdapter {
    fn exists(&self, path: &str) -> CoreResult<Existence> {
        let full = self.full_path(path);
        if full.is_dir() {
            Ok(Existence::Folder)
        } else if full.is_file() {
            Ok(Existence::File)
        } else {
            Ok(Existence::Absent)
        }
    }

    fn create_folder(&self, path: &str) -> CoreResult<()> {
        fs::create_dir_all(self.full_path(path))?;
        Ok(())
    }

    fn create_file(&self, path: &str) -> CoreResult<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(full)?;
        Ok(())
    }

    fn has_file_data(&self, path: &str) -> CoreResult<bool> {
        let full = self.full_path(path);
        Ok(full.is_file() && full.metadata().map(|m| m.len() > 0).unwrap_or(false))
    }

    fn get_file_data(&self, path: &str) -> CoreResult<Box<dyn Read + Send>> {
        let full = self.full_path(path);
        if !full.is_file() {
            return Err(CoreError::NotFound(path.to_string()));
        }
        Ok(Box::new(File::open(full)?))
    }

    fn set_file_data(&self, path: &str, data: &mut dyn Read) -> CoreResult<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(full)?;
        io::copy(data, &mut file)?;
        Ok(())
    }

    fn has_native_support_for_renaming(&self) -> bool {
        true
    }

    fn rename_folder(&self, path: &str, new_name: &str) -> CoreResult<()> {
        self.native_rename(path, new_name)
    }

    fn rename_file(&self, path: &str, new_name: &str) -> CoreResult<()> {
        self.native_rename(path, new_name)
    }

    fn list_folder(&self, path: &str) -> CoreResult<Vec<String>> {
        let full = self.full_path(path);
        if !full.is_dir() {
            return Err(CoreError::NotFound(path.to_string()));
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(full)? {
            let entry = entry?;
            out.push(self.hashed_path_of(&entry.path()));
        }
        Ok(out)
    }

    fn delete_folder(&self, path: &str, is_okay_if_not_exists: bool) -> CoreResult<()> {
        let full = self.full_path(path);
        match fs::remove_dir(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound && is_okay_if_not_exists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_file(&self, path: &str, is_okay_if_not_exists: bool) -> CoreResult<()> {
        let full = self.full_path(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound && is_okay_if_not_exists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl LocalAdapter {
    fn native_rename(&self, path: &str, new_name: &str) -> CoreResult<()> {
        let full = self.full_path(path);
        let parent = full.parent().ok_or_else(|| {
            CoreError::InvalidPath("cannot rename the storage root".to_string())
        })?;
        fs::rename(&full, parent.join(new_name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_exist_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalAdapter::new(dir.path()).unwrap();
        adapter.create_folder("/tree/").unwrap();
        adapter.create_file("/tree/leaf.file").unwrap();

        assert_eq!(adapter.exists("/tree/").unwrap(), Existence::Folder);
        assert_eq!(adapter.exists("/tree/leaf.file").unwrap(), Existence::File);
        assert_eq!(adapter.exists("/tree/missing").unwrap(), Existence::Absent);
    }

    #[test]
    fn set_and_get_file_data() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalAdapter::new(dir.path()).unwrap();
        adapter.create_folder("/lookup/").unwrap();
        adapter
            .set_file_data("/lookup/blob.data", &mut &b"payload"[..])
            .unwrap();
        let mut out = Vec::new();
        adapter
            .get_file_data("/lookup/blob.data")
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"payload");
    }
}
