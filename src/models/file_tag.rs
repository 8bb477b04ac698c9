use serde::{Deserialize, Serialize};

use super::{FileId, TagId, ValueId};

/// One edge of the many-to-many file/tag graph.
///
/// The triple (file, tag, value) is unique; `ValueId::NONE` marks an
/// association without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileTag {
    file_id: FileId,
    tag_id: TagId,
    value_id: ValueId,
}

impl FileTag {
    /// Creates a new association.
    pub fn new(file_id: FileId, tag_id: TagId, value_id: ValueId) -> Self {
        Self {
            file_id,
            tag_id,
            value_id,
        }
    }

    /// Returns the file side of the association.
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Returns the tag side of the association.
    pub fn tag_id(&self) -> TagId {
        self.tag_id
    }

    /// Returns the attached value, `ValueId::NONE` if there is none.
    pub fn value_id(&self) -> ValueId {
        self.value_id
    }
}
