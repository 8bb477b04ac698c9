//! Typed entities shared between the storage layer, the query
//! resolver, and the virtual filesystem.

mod file;
mod file_tag;
mod ids;
mod saved_query;
mod tag;
mod value;

pub use file::File;
pub use file_tag::FileTag;
pub use ids::{FileId, TagId, ValueId};
pub use saved_query::SavedQuery;
pub use tag::Tag;
pub use value::Value;
