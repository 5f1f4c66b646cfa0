//! In-memory directory tree holding one device's filesystem.
//!
//! Paths are relative to the filesystem root. Errors carry only an
//! `io::ErrorKind`; callers attach the guest path when reporting.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, modified: SystemTime },
    Directory { modified: SystemTime },
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// A single filesystem. All data is lost when dropped.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    entries: HashMap<PathBuf, Entry>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

fn error(kind: io::ErrorKind) -> io::Error {
    io::Error::from(kind)
}

impl MemoryTree {
    /// Create an empty filesystem containing only its root directory.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            PathBuf::new(),
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        Self { entries }
    }

    /// Normalize a path: drop the root, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => result.push(s),
                Component::ParentDir => {
                    result.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    /// The parent of `path` must already be a directory.
    fn check_parent(&self, path: &Path) -> io::Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        match self.entries.get(parent) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(error(io::ErrorKind::NotADirectory)),
            None => Err(error(io::ErrorKind::NotFound)),
        }
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.entries.get(&Self::normalize(path)),
            Some(Entry::Directory { .. })
        )
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.entries.contains_key(&Self::normalize(path))
    }

    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.entries.get(&Self::normalize(path)) {
            Some(Entry::File { data, .. }) => Ok(data.clone()),
            Some(Entry::Directory { .. }) => Err(error(io::ErrorKind::IsADirectory)),
            None => Err(error(io::ErrorKind::NotFound)),
        }
    }

    /// Create or replace a file.
    pub fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        let normalized = Self::normalize(path);
        if let Some(Entry::Directory { .. }) = self.entries.get(&normalized) {
            return Err(error(io::ErrorKind::IsADirectory));
        }
        self.check_parent(&normalized)?;
        self.entries.insert(
            normalized,
            Entry::File {
                data: data.to_vec(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Create an empty file, or bump the timestamp of an existing one.
    pub fn touch(&mut self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);
        match self.entries.get_mut(&normalized) {
            Some(Entry::File { modified, .. }) | Some(Entry::Directory { modified }) => {
                *modified = SystemTime::now();
                Ok(())
            }
            None => self.write(&normalized, &[]),
        }
    }

    /// Create one directory. The parent must exist.
    pub fn mkdir(&mut self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);
        if self.entries.contains_key(&normalized) {
            return Err(error(io::ErrorKind::AlreadyExists));
        }
        self.check_parent(&normalized)?;
        self.entries.insert(
            normalized,
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Direct children of a directory, sorted by name.
    pub fn list(&self, path: &Path) -> io::Result<Vec<TreeEntry>> {
        let normalized = Self::normalize(path);
        match self.entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => return Err(error(io::ErrorKind::NotADirectory)),
            None => return Err(error(io::ErrorKind::NotFound)),
        }

        let mut result: Vec<TreeEntry> = self
            .entries
            .iter()
            .filter(|(p, _)| *p != &normalized && p.parent() == Some(normalized.as_path()))
            .filter_map(|(p, entry)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let kind = match entry {
                    Entry::File { .. } => EntryKind::File,
                    Entry::Directory { .. } => EntryKind::Directory,
                };
                Some(TreeEntry { name, kind })
            })
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    /// Remove a file or an empty directory. The root cannot be removed.
    pub fn remove(&mut self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(error(io::ErrorKind::PermissionDenied));
        }
        match self.entries.get(&normalized) {
            Some(Entry::File { .. }) => {}
            Some(Entry::Directory { .. }) => {
                let has_children = self
                    .entries
                    .keys()
                    .any(|p| p.parent() == Some(normalized.as_path()));
                if has_children {
                    return Err(error(io::ErrorKind::DirectoryNotEmpty));
                }
            }
            None => return Err(error(io::ErrorKind::NotFound)),
        }
        self.entries.remove(&normalized);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let mut tree = MemoryTree::new();
        tree.write(Path::new("/motd"), b"hello").unwrap();
        assert_eq!(tree.read(Path::new("motd")).unwrap(), b"hello");
    }

    #[test]
    fn write_requires_parent() {
        let mut tree = MemoryTree::new();
        let err = tree.write(Path::new("/etc/motd"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        tree.mkdir(Path::new("/etc")).unwrap();
        tree.write(Path::new("/etc/motd"), b"x").unwrap();
    }

    #[test]
    fn list_direct_children_sorted() {
        let mut tree = MemoryTree::new();
        tree.mkdir(Path::new("/etc")).unwrap();
        tree.touch(Path::new("/b")).unwrap();
        tree.write(Path::new("/a"), b"12").unwrap();
        tree.touch(Path::new("/etc/fstab")).unwrap();

        let names: Vec<_> = tree
            .list(Path::new("/"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "etc"]);

        let etc = tree.list(Path::new("/etc")).unwrap();
        assert_eq!(etc.len(), 1);
        assert_eq!(etc[0].kind, EntryKind::File);
    }

    #[test]
    fn remove_rejects_non_empty_directory() {
        let mut tree = MemoryTree::new();
        tree.mkdir(Path::new("/d")).unwrap();
        tree.touch(Path::new("/d/f")).unwrap();

        let err = tree.remove(Path::new("/d")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);

        tree.remove(Path::new("/d/f")).unwrap();
        tree.remove(Path::new("/d")).unwrap();
        assert!(!tree.exists(Path::new("/d")));
    }

    #[test]
    fn mkdir_twice_fails() {
        let mut tree = MemoryTree::new();
        tree.mkdir(Path::new("/d")).unwrap();
        let err = tree.mkdir(Path::new("/d")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn dot_dot_cannot_escape_root() {
        let mut tree = MemoryTree::new();
        tree.touch(Path::new("/../../x")).unwrap();
        assert!(tree.exists(Path::new("/x")));
    }
}
