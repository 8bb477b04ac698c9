//! Directory-entry types and the shared path/link-name helpers used by
//! both namespace branches.

use std::time::SystemTime;

use crate::models::{File, FileId};

/// Maximum length of a generated link name, matching the common
/// filesystem component limit.
const MAX_LINK_NAME_LEN: usize = 255;

/// What kind of entry a name denotes in the projected namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A real or synthetic directory.
    Directory,
    /// A symbolic link back to a real file.
    Link,
    /// The read-only help document.
    Document,
}

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: EntryKind,
}

impl DirEntry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn link(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Link,
        }
    }

    pub fn document(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Document,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}

/// Attributes of a projected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    kind: EntryKind,
    size: u64,
    modified: Option<SystemTime>,
}

impl Attributes {
    pub fn directory(size: u64) -> Self {
        Self {
            kind: EntryKind::Directory,
            size,
            modified: None,
        }
    }

    pub fn link(size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::Link,
            size,
            modified,
        }
    }

    pub fn document(size: u64) -> Self {
        Self {
            kind: EntryKind::Document,
            size,
            modified: None,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Splits a namespace path into segments, ignoring empty ones.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Encodes the link name for a file: the base name with the file ID
/// spliced in before the extension, so `/x/photo.jpg` with ID 7
/// becomes `photo.7.jpg`.
///
/// The stem is truncated if necessary to keep the whole name within
/// 255 bytes.
pub fn link_name(file: &File) -> String {
    let base = file
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem, extension) = match base.rfind('.') {
        Some(index) if index > 0 => base.split_at(index),
        _ => (base.as_str(), ""),
    };

    let suffix = format!(".{}{}", file.id(), extension);

    let mut stem = stem.to_string();
    if stem.len() + suffix.len() > MAX_LINK_NAME_LEN {
        let mut cut = MAX_LINK_NAME_LEN - suffix.len();
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
    }

    stem + &suffix
}

/// Decodes the file ID from a link name: tries the second-to-last
/// dot-separated component first, then the last as a fallback.
/// Returns `None` when the name is not a file link.
pub fn parse_file_id(name: &str) -> Option<FileId> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 2 {
        return None;
    }

    parts[parts.len() - 2]
        .parse::<i64>()
        .ok()
        .or_else(|| parts[parts.len() - 1].parse::<i64>().ok())
        .filter(|&id| id > 0)
        .map(FileId::new)
}
