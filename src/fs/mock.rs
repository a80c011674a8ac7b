use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Paths are used verbatim as keys; relative paths hang off the `"."` root.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

fn parent_key(path: &Path) -> Option<&Path> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        }
    })
}

fn child_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.entries();
        Self::insert_file(&mut files, path.as_ref(), content.into());
    }

    /// Sorted list of every file path currently stored.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let files = self.entries();
        let mut paths: Vec<PathBuf> = files
            .iter()
            .filter(|(_, entry)| matches!(entry, MockEntry::File(_)))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn insert_file(files: &mut HashMap<PathBuf, MockEntry>, path: &Path, content: Vec<u8>) {
        files.insert(path.to_path_buf(), MockEntry::File(content));

        // Parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = parent_key(path) {
            Self::ensure_dir_entry(files, parent);
            Self::link_child(files, parent, path);
        }
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, path: &Path) {
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(parent), child_name(path))
        {
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_key(path) {
            if parent != path {
                // Avoid infinite loop at root
                Self::ensure_dir_entry(files, parent);
                Self::link_child(files, parent, path);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.entries();
        if let Some(MockEntry::File(_)) = files.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        Self::ensure_dir_entry(&mut files, path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.entries();
        match files.get(path) {
            Some(MockEntry::Dir(_)) => {}
            Some(MockEntry::File(_)) => return Err(anyhow!("Not a directory: {:?}", path)),
            None => return Err(anyhow!("Directory not found: {:?}", path)),
        }

        files.retain(|key, _| !key.starts_with(path));

        if let (Some(parent), Some(name)) = (parent_key(path), child_name(path)) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|child| *child != name);
            }
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.entries();
        let content = match files.get(from) {
            Some(MockEntry::File(content)) => content.clone(),
            Some(MockEntry::Dir(_)) => return Err(anyhow!("Is a directory: {:?}", from)),
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        if let Some(MockEntry::Dir(_)) = files.get(to) {
            return Err(anyhow!("Is a directory: {:?}", to));
        }
        Self::insert_file(&mut files, to, content);
        Ok(())
    }
}
