use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::FileId;

/// One record per absolute path on the real filesystem.
///
/// The projection engine only reads file records and deletes
/// associations; file lifecycle is driven by the tagging commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    id: FileId,
    path: PathBuf,
    fingerprint: Option<String>,
    mod_time: i64,
    size: u64,
    is_dir: bool,
}

impl File {
    /// Creates a new file record.
    pub fn new(
        id: FileId,
        path: impl Into<PathBuf>,
        fingerprint: Option<String>,
        mod_time: i64,
        size: u64,
        is_dir: bool,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            fingerprint,
            mod_time,
            size,
            is_dir,
        }
    }

    /// Returns the file's unique identifier.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Returns the file's absolute path on the real filesystem.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the content fingerprint recorded at tagging time, if any.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Returns the modification time recorded at tagging time, as a
    /// unix timestamp in seconds.
    pub fn mod_time(&self) -> i64 {
        self.mod_time
    }

    /// Returns the size recorded at tagging time, in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns true if the path was a directory at tagging time.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}
