use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Snapshot of one file-system object, taken when it was enumerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,
    /// Only present for files.
    pub size: Option<u64>,
}

impl Entry {
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            name,
            path: path.to_path_buf(),
            kind,
            created: metadata.created().ok().map(DateTime::from),
            modified: metadata.modified().ok().map(DateTime::from),
            accessed: metadata.accessed().ok().map(DateTime::from),
            size: match kind {
                EntryKind::File => Some(metadata.len()),
                EntryKind::Directory => None,
            },
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryKind};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_snapshot_carries_size_and_name() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo0001.jpg");
        fs::write(&path, b"12345").expect("write file");

        let metadata = fs::metadata(&path).expect("metadata");
        let entry = Entry::from_metadata(&path, &metadata);

        assert_eq!(entry.name, "photo0001.jpg");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, Some(5));
        assert!(entry.modified.is_some());
        assert_eq!(entry.parent(), temp.path());
    }

    #[test]
    fn directory_snapshot_has_no_size() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("album");
        fs::create_dir(&path).expect("create dir");

        let metadata = fs::metadata(&path).expect("metadata");
        let entry = Entry::from_metadata(&path, &metadata);

        assert!(entry.is_dir());
        assert!(!entry.is_file());
        assert_eq!(entry.size, None);
    }
}
