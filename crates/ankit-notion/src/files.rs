//! The unpacked export: relative path to file contents.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::Result;

/// Files of an export, keyed by `/`-separated relative path.
///
/// Keys are kept sorted, so lookups that scan the keys are deterministic.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    entries: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    /// Create an empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), contents.into());
    }

    /// Raw contents of a file.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Contents of a file as text.
    pub fn get_html(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Resolve a link target to a file.
    ///
    /// An exact key wins; otherwise the first key (in sorted order) that
    /// contains `target` is used.
    pub fn find_page(&self, target: &str) -> Option<(&str, &[u8])> {
        if target.is_empty() {
            return None;
        }
        if let Some((key, contents)) = self.entries.get_key_value(target) {
            return Some((key.as_str(), contents.as_slice()));
        }
        self.entries
            .iter()
            .find(|(key, _)| key.contains(target))
            .map(|(key, contents)| (key.as_str(), contents.as_slice()))
    }

    /// The first top-level HTML page, which is the export's root page.
    pub fn root_page(&self) -> Option<&str> {
        self.entries
            .keys()
            .find(|key| !key.contains('/') && key.to_lowercase().ends_with(".html"))
            .map(String::as_str)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every file below `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Self::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.insert(key, std::fs::read(&path)?);
            }
        }
        Ok(files)
    }

    /// Unpack a ZIP archive held in memory.
    pub fn from_zip(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut files = Self::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }
        Ok(files)
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut files = Self::new();
        for (path, contents) in iter {
            files.insert(path, contents);
        }
        files
    }
}
