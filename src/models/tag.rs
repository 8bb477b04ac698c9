use serde::{Deserialize, Serialize};

use super::TagId;

/// A named label applicable to files, many-to-many.
///
/// Tag names are globally unique; the storage layer enforces this with
/// a unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
}

impl Tag {
    /// Creates a new tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagfs::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "cheese");
    /// assert_eq!(tag.id(), TagId::new(1));
    /// assert_eq!(tag.name(), "cheese");
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the tag's unique identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the tag's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_accessors() {
        let tag = Tag::new(TagId::new(7), "wine");
        assert_eq!(tag.id().get(), 7);
        assert_eq!(tag.name(), "wine");
    }
}
