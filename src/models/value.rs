use serde::{Deserialize, Serialize};

use super::ValueId;

/// A named qualifier attached to a specific file/tag association,
/// enabling ordered and equality comparisons (e.g. `rating=5`).
///
/// Value names are globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    id: ValueId,
    name: String,
}

impl Value {
    /// Creates a new value.
    pub fn new(id: ValueId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the value's unique identifier.
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Returns the value's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
