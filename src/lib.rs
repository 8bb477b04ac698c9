//! tagfs: a tag-based file organizer.
//!
//! Files on the real filesystem are annotated with tags (optionally
//! carrying a value) in a SQLite store; a virtual filesystem projects
//! those tags and ad-hoc boolean queries over tags as navigable
//! directories of symbolic links back to the real files.

pub mod db;
pub mod fingerprint;
pub mod models;
pub mod query;
pub mod storage;
pub mod vfs;

pub use db::Database;
pub use models::{File, FileId, FileTag, SavedQuery, Tag, TagId, Value, ValueId};
pub use storage::Storage;
pub use vfs::{TagFs, VirtualFs};
