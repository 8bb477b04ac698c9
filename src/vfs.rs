//! Namespace projection engine: interprets paths under the `tags/` and
//! `queries/` roots as query evaluations, and translates filesystem
//! mutations into storage mutations.
//!
//! [`VirtualFs`] is path-addressed and protocol-agnostic; the FUSE
//! adapter in [`fuse`] maps the kernel's inode-based protocol onto it.

mod entry;
pub mod fuse;

use std::collections::HashSet;
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

pub use entry::{Attributes, DirEntry, EntryKind, link_name, parse_file_id, split_path};
pub use fuse::{TagFs, mount};

use crate::models::FileId;
use crate::query::{self, Expression};
use crate::storage::Storage;

/// Top-level branch for literal tag-intersection paths.
pub const TAGS_DIR: &str = "tags";
/// Top-level branch for query-text paths.
pub const QUERIES_DIR: &str = "queries";
/// Name of the help document served when no queries are saved.
pub const QUERY_HELP_FILENAME: &str = "README.md";

/// Static usage guidance served at `queries/README.md`.
pub const QUERY_DIR_HELP: &str = "Query Directories
-----------------

Navigate to any directory that is a valid query to see a view of the files that
match the query:

    $ ls
    README.md
    $ ls \"cheese and wine\"
    pinot_cheddar.12  edam_blanc.14
    $ ls \"cheese and (tomato or mushroom)\"
    margherita.7  funghi.11
    $ ls
    cheese and (tomato or mushroom)  cheese and wine

Query directories are saved automatically and can be removed with `rmdir`.
";

/// Request-scoped projection failures, mapped to protocol error codes
/// by the host adapter.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Unknown tag name, unknown query, unknown file id, or malformed
    /// query text encountered during path resolution.
    #[error("entry not found")]
    NotFound,

    /// A mutation outside the modeled shape, e.g. removing a nested
    /// tag directory or unlinking under `queries/`.
    #[error("operation not permitted")]
    NotPermitted,

    /// Creating a directory under `queries/`.
    #[error("invalid argument")]
    InvalidArgument,

    /// Deleting a tag that still has associations.
    #[error("directory not empty")]
    DirectoryNotEmpty,

    /// A protocol call this namespace does not model.
    #[error("operation not supported")]
    Unsupported,

    /// A storage-layer failure: fatal for the in-flight call, reported
    /// as a generic failure, never retried here.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The virtual namespace over a storage handle.
///
/// Holds no mutable state of its own; every call resolves against the
/// current tagging state, and every mutating call applies exactly one
/// committed change-set.
pub struct VirtualFs {
    store: Storage,
}

impl VirtualFs {
    /// Creates the namespace over the given storage handle.
    pub fn new(store: Storage) -> Self {
        Self { store }
    }

    /// Returns a reference to the storage collaborator.
    pub fn store(&self) -> &Storage {
        &self.store
    }

    /// Resolves a path to entry attributes.
    ///
    /// Resolving a previously-unseen, valid query text under
    /// `queries/` persists it as a saved query (idempotently) before
    /// returning success.
    pub fn attributes(&self, path: &str) -> Result<Attributes, VfsError> {
        debug!("attributes({path})");

        let segments = split_path(path);
        match segments.as_slice() {
            [] => Ok(Attributes::directory(0)),
            [TAGS_DIR] => Ok(Attributes::directory(self.store.tag_count()?)),
            [QUERIES_DIR] => Ok(Attributes::directory(0)),
            [TAGS_DIR, rest @ ..] => self.tagged_entry_attributes(rest),
            [QUERIES_DIR, rest @ ..] => self.query_entry_attributes(rest),
            _ => Err(VfsError::NotFound),
        }
    }

    /// Lists a directory.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        debug!("read_dir({path})");

        let segments = split_path(path);
        match segments.as_slice() {
            [] => Ok(vec![
                DirEntry::directory(TAGS_DIR),
                DirEntry::directory(QUERIES_DIR),
            ]),
            [TAGS_DIR] => {
                let tags = self.store.tags()?;
                Ok(tags
                    .into_iter()
                    .map(|tag| DirEntry::directory(tag.name()))
                    .collect())
            }
            [QUERIES_DIR] => {
                let queries = self.store.saved_queries()?;
                if queries.is_empty() {
                    return Ok(vec![DirEntry::document(QUERY_HELP_FILENAME)]);
                }
                Ok(queries
                    .into_iter()
                    .map(|query| DirEntry::directory(query.text()))
                    .collect())
            }
            [TAGS_DIR, rest @ ..] => self.list_tagged_dir(rest),
            [QUERIES_DIR, text, ..] => self.list_query_dir(text),
            _ => Err(VfsError::NotFound),
        }
    }

    /// Resolves a file-link leaf to its target: the file's absolute
    /// path on the real filesystem.
    pub fn read_link(&self, path: &str) -> Result<PathBuf, VfsError> {
        debug!("read_link({path})");

        let segments = split_path(path);
        let (&root, rest) = segments.split_first().ok_or(VfsError::NotFound)?;
        if root != TAGS_DIR && root != QUERIES_DIR {
            return Err(VfsError::NotFound);
        }

        let name = rest.last().ok_or(VfsError::NotFound)?;
        let file_id = parse_file_id(name).ok_or(VfsError::NotFound)?;
        let file = self.store.file_by_id(file_id)?.ok_or(VfsError::NotFound)?;

        Ok(file.path().to_path_buf())
    }

    /// Serves the read-only help document.
    pub fn read_document(&self, path: &str) -> Result<&'static [u8], VfsError> {
        let segments = split_path(path);
        match segments.as_slice() {
            [QUERIES_DIR, QUERY_HELP_FILENAME] => Ok(QUERY_DIR_HELP.as_bytes()),
            _ => Err(VfsError::Unsupported),
        }
    }

    /// Creates a tag: `mkdir tags/<name>`.
    pub fn make_dir(&self, path: &str) -> Result<(), VfsError> {
        debug!("make_dir({path})");

        let segments = split_path(path);
        if segments.len() != 2 {
            return Err(VfsError::NotPermitted);
        }

        match segments[0] {
            TAGS_DIR => {
                let name = segments[1];
                self.store
                    .unit_of_work(|store| store.add_tag(name).map(|_| ()))?;
                Ok(())
            }
            QUERIES_DIR => Err(VfsError::InvalidArgument),
            _ => Err(VfsError::Unsupported),
        }
    }

    /// Deletes a tag (only if unreferenced) or a saved query:
    /// `rmdir tags/<name>` or `rmdir queries/<text>`.
    pub fn remove_dir(&self, path: &str) -> Result<(), VfsError> {
        debug!("remove_dir({path})");

        let segments = split_path(path);
        match segments.first() {
            Some(&TAGS_DIR) => {
                if segments.len() != 2 {
                    // only top-level tag directories can be removed
                    return Err(VfsError::NotPermitted);
                }

                let name = segments[1];
                let tag = self.store.tag_by_name(name)?.ok_or(VfsError::NotFound)?;

                if self.store.file_tag_count_by_tag_id(tag.id())? > 0 {
                    return Err(VfsError::DirectoryNotEmpty);
                }

                self.store.unit_of_work(|store| store.delete_tag(tag.id()))?;
                Ok(())
            }
            Some(&QUERIES_DIR) => {
                if segments.len() != 2 {
                    return Err(VfsError::NotPermitted);
                }

                let text = segments[1];
                self.store.unit_of_work(|store| store.delete_query(text))?;
                Ok(())
            }
            _ => Err(VfsError::Unsupported),
        }
    }

    /// Renames a tag: `mv tags/<old> tags/<new>`.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<(), VfsError> {
        debug!("rename({old_path}, {new_path})");

        let old = split_path(old_path);
        let new = split_path(new_path);

        if old.len() != 2 || new.len() != 2 {
            return Err(VfsError::NotPermitted);
        }
        if old[0] != TAGS_DIR || new[0] != TAGS_DIR {
            return Err(VfsError::NotPermitted);
        }

        let tag = self.store.tag_by_name(old[1])?.ok_or(VfsError::NotFound)?;
        self.store
            .unit_of_work(|store| store.rename_tag(tag.id(), new[1]).map(|_| ()))?;
        Ok(())
    }

    /// Removes the association between a file link and its immediate
    /// parent tag: `rm tags/.../<tag>/<link>`.
    pub fn unlink(&self, path: &str) -> Result<(), VfsError> {
        debug!("unlink({path})");

        let segments = split_path(path);
        let name = segments.last().ok_or(VfsError::NotPermitted)?;

        // only file symbolic links can be unlinked
        let file_id = parse_file_id(name).ok_or(VfsError::NotPermitted)?;

        if self.store.file_by_id(file_id)?.is_none() {
            // report success if the file record is gone, otherwise
            // recursive deletes by callers fail halfway
            return Ok(());
        }

        match segments.first() {
            Some(&TAGS_DIR) => {
                if segments.len() < 3 {
                    return Err(VfsError::NotFound);
                }

                let tag_name = segments[segments.len() - 2];
                let tag = self
                    .store
                    .tag_by_name(tag_name)?
                    .ok_or(VfsError::NotFound)?;

                self.store
                    .unit_of_work(|store| store.delete_file_tags(file_id, tag.id()))?;
                Ok(())
            }
            Some(&QUERIES_DIR) => Err(VfsError::NotPermitted),
            _ => Err(VfsError::Unsupported),
        }
    }

    fn tagged_entry_attributes(&self, rest: &[&str]) -> Result<Attributes, VfsError> {
        let name = rest.last().ok_or(VfsError::NotFound)?;

        if let Some(file_id) = parse_file_id(name) {
            return self.file_entry_attributes(file_id);
        }

        // a tag directory: every segment must name an existing tag
        for segment in rest {
            if self.store.tag_by_name(segment)?.is_none() {
                return Err(VfsError::NotFound);
            }
        }

        Ok(Attributes::directory(0))
    }

    fn query_entry_attributes(&self, rest: &[&str]) -> Result<Attributes, VfsError> {
        if let [QUERY_HELP_FILENAME] = rest {
            return Ok(Attributes::document(QUERY_DIR_HELP.len() as u64));
        }

        if rest.len() > 1 {
            let name = rest.last().ok_or(VfsError::NotFound)?;
            let file_id = parse_file_id(name).ok_or(VfsError::NotFound)?;
            return self.file_entry_attributes(file_id);
        }

        let text = rest.first().ok_or(VfsError::NotFound)?;

        if text.ends_with(' ') {
            // prevent duplicate entries for the same query while an
            // interactive client is still typing the path
            return Err(VfsError::NotFound);
        }

        self.parse_and_validate(text)?;

        // persist the bookmark lazily; saving is idempotent
        self.store.unit_of_work(|store| store.add_query(text))?;

        Ok(Attributes::directory(0))
    }

    fn file_entry_attributes(&self, file_id: FileId) -> Result<Attributes, VfsError> {
        let file = self.store.file_by_id(file_id)?.ok_or(VfsError::NotFound)?;

        // mirror the underlying file when reachable, report zero/unset
        // rather than failing otherwise
        match std::fs::metadata(file.path()) {
            Ok(metadata) => Ok(Attributes::link(
                metadata.len(),
                metadata.modified().ok(),
            )),
            Err(_) => Ok(Attributes::link(0, None)),
        }
    }

    fn list_tagged_dir(&self, path_tags: &[&str]) -> Result<Vec<DirEntry>, VfsError> {
        let expression = Expression::has_all(path_tags.iter().copied());
        let files = self.store.query_files(&expression)?;

        let path_set: HashSet<&str> = path_tags.iter().copied().collect();

        // tags present on the matched set but not already in the path
        // become synthetic subdirectories
        let mut further: Vec<String> = Vec::new();
        for file in &files {
            let file_tags = self.store.file_tags_by_file_id(file.id())?;
            let tags = self
                .store
                .tags_by_ids(file_tags.iter().map(|ft| ft.tag_id()))?;

            for tag in tags {
                if !path_set.contains(tag.name()) && !further.iter().any(|n| n == tag.name()) {
                    further.push(tag.name().to_string());
                }
            }
        }

        let mut entries = Vec::with_capacity(further.len() + files.len());
        for name in further {
            entries.push(DirEntry::directory(name));
        }
        for file in &files {
            entries.push(DirEntry::link(link_name(file)));
        }

        Ok(entries)
    }

    fn list_query_dir(&self, text: &str) -> Result<Vec<DirEntry>, VfsError> {
        let expression = self.parse_and_validate(text)?;
        let files = self.store.query_files(&expression)?;

        Ok(files
            .iter()
            .map(|file| DirEntry::link(link_name(file)))
            .collect())
    }

    /// Parses query text and checks every referenced tag name exists;
    /// both failures surface as "entry not found".
    fn parse_and_validate(&self, text: &str) -> Result<Expression, VfsError> {
        let expression = match query::parse(text) {
            Ok(expression) => expression,
            Err(error) => {
                debug!("rejecting malformed query '{text}': {error}");
                return Err(VfsError::NotFound);
            }
        };

        for name in expression.tag_names() {
            if self.store.tag_by_name(name)?.is_none() {
                return Err(VfsError::NotFound);
            }
        }

        Ok(expression)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::db::Database;
    use crate::models::{File, ValueId};

    fn vfs() -> VirtualFs {
        VirtualFs::new(Storage::new(Database::in_memory().unwrap()))
    }

    fn tag_file(vfs: &VirtualFs, path: &str, tag: &str) -> File {
        let store = vfs.store();
        let file = match store.file_by_path(Path::new(path)).unwrap() {
            Some(file) => file,
            None => store.add_file(Path::new(path), None, 0, 0, false).unwrap(),
        };
        let tag = match store.tag_by_name(tag).unwrap() {
            Some(tag) => tag,
            None => store.add_tag(tag).unwrap(),
        };
        store
            .add_file_tag(file.id(), tag.id(), ValueId::NONE)
            .unwrap();
        file
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn root_lists_the_two_branches() {
        let vfs = vfs();
        let entries = vfs.read_dir("").unwrap();
        assert_eq!(names(&entries), vec![TAGS_DIR, QUERIES_DIR]);
        assert!(entries.iter().all(|e| e.kind() == EntryKind::Directory));
    }

    #[test]
    fn unknown_root_is_not_found() {
        let vfs = vfs();
        assert!(matches!(vfs.read_dir("bogus"), Err(VfsError::NotFound)));
        assert!(matches!(
            vfs.attributes("bogus/deeper"),
            Err(VfsError::NotFound)
        ));
    }

    #[test]
    fn tags_root_lists_all_tags() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "wine");
        tag_file(&vfs, "/x/a", "cheese");

        let entries = vfs.read_dir(TAGS_DIR).unwrap();
        assert_eq!(names(&entries), vec!["cheese", "wine"]);
    }

    #[test]
    fn tag_dir_lists_further_tags_and_file_links() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/x/photo.jpg", "a");
        tag_file(&vfs, "/x/photo.jpg", "b");

        let entries = vfs.read_dir("tags/a").unwrap();
        let link = format!("photo.{}.jpg", file.id());
        assert_eq!(names(&entries), vec!["b", link.as_str()]);
        assert_eq!(entries[0].kind(), EntryKind::Directory);
        assert_eq!(entries[1].kind(), EntryKind::Link);
    }

    #[test]
    fn tag_intersection_path_narrows_the_set() {
        let vfs = vfs();
        let both = tag_file(&vfs, "/x/both.txt", "a");
        tag_file(&vfs, "/x/both.txt", "b");
        tag_file(&vfs, "/x/only_a.txt", "a");

        let entries = vfs.read_dir("tags/a/b").unwrap();
        assert_eq!(
            names(&entries),
            vec![format!("both.{}.txt", both.id()).as_str()]
        );
    }

    #[test]
    fn tag_dir_attributes_require_every_segment_to_exist() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "real");

        assert!(vfs.attributes("tags/real").is_ok());
        assert!(matches!(
            vfs.attributes("tags/real/fake"),
            Err(VfsError::NotFound)
        ));
    }

    #[test]
    fn file_link_attributes_mirror_missing_file_as_zero() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/definitely/not/here.txt", "t");

        let attrs = vfs
            .attributes(&format!("tags/t/here.{}.txt", file.id()))
            .unwrap();
        assert_eq!(attrs.kind(), EntryKind::Link);
        assert_eq!(attrs.size(), 0);
        assert!(attrs.modified().is_none());
    }

    #[test]
    fn read_link_returns_absolute_target() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/x/photo.jpg", "a");

        let target = vfs
            .read_link(&format!("tags/a/photo.{}.jpg", file.id()))
            .unwrap();
        assert_eq!(target, Path::new("/x/photo.jpg"));
    }

    #[test]
    fn queries_root_serves_help_when_no_queries_saved() {
        let vfs = vfs();

        let entries = vfs.read_dir(QUERIES_DIR).unwrap();
        assert_eq!(names(&entries), vec![QUERY_HELP_FILENAME]);
        assert_eq!(entries[0].kind(), EntryKind::Document);

        let attrs = vfs.attributes("queries/README.md").unwrap();
        assert_eq!(attrs.kind(), EntryKind::Document);
        assert_eq!(attrs.size(), QUERY_DIR_HELP.len() as u64);

        let body = vfs.read_document("queries/README.md").unwrap();
        assert_eq!(body, QUERY_DIR_HELP.as_bytes());
    }

    #[test]
    fn resolving_a_valid_query_saves_it_idempotently() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "cheese");
        tag_file(&vfs, "/x/a", "wine");

        vfs.attributes("queries/cheese and wine").unwrap();
        vfs.attributes("queries/cheese and wine").unwrap();

        let queries = vfs.store().saved_queries().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].text(), "cheese and wine");

        let entries = vfs.read_dir(QUERIES_DIR).unwrap();
        assert_eq!(names(&entries), vec!["cheese and wine"]);
    }

    #[test]
    fn malformed_query_is_not_found_and_not_saved() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");

        assert!(matches!(
            vfs.attributes("queries/a and"),
            Err(VfsError::NotFound)
        ));
        assert!(vfs.store().saved_queries().unwrap().is_empty());
    }

    #[test]
    fn query_with_unknown_tag_is_not_found_and_not_saved() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");

        assert!(matches!(
            vfs.attributes("queries/a and missing"),
            Err(VfsError::NotFound)
        ));
        assert!(vfs.store().saved_queries().unwrap().is_empty());
    }

    #[test]
    fn trailing_space_query_is_always_not_found() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");

        assert!(matches!(
            vfs.attributes("queries/a "),
            Err(VfsError::NotFound)
        ));
        assert!(vfs.store().saved_queries().unwrap().is_empty());
    }

    #[test]
    fn query_dir_lists_matching_file_links() {
        let vfs = vfs();
        let both = tag_file(&vfs, "/x/both.txt", "cheese");
        tag_file(&vfs, "/x/both.txt", "wine");
        tag_file(&vfs, "/x/cheddar.txt", "cheese");

        let entries = vfs.read_dir("queries/cheese and wine").unwrap();
        assert_eq!(
            names(&entries),
            vec![format!("both.{}.txt", both.id()).as_str()]
        );
    }

    #[test]
    fn mkdir_creates_tag_at_depth_one_only() {
        let vfs = vfs();

        vfs.make_dir("tags/fresh").unwrap();
        assert!(vfs.store().tag_by_name("fresh").unwrap().is_some());

        assert!(matches!(
            vfs.make_dir("tags/fresh/nested"),
            Err(VfsError::NotPermitted)
        ));
        assert!(matches!(
            vfs.make_dir("queries/q"),
            Err(VfsError::InvalidArgument)
        ));
    }

    #[test]
    fn rmdir_refuses_referenced_tag_then_succeeds_after_unlink() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/x/doc.txt", "c");

        assert!(matches!(
            vfs.remove_dir("tags/c"),
            Err(VfsError::DirectoryNotEmpty)
        ));

        vfs.unlink(&format!("tags/c/doc.{}.txt", file.id())).unwrap();
        vfs.remove_dir("tags/c").unwrap();
        assert!(vfs.store().tag_by_name("c").unwrap().is_none());
    }

    #[test]
    fn rmdir_unknown_tag_is_not_found() {
        let vfs = vfs();
        assert!(matches!(
            vfs.remove_dir("tags/ghost"),
            Err(VfsError::NotFound)
        ));
    }

    #[test]
    fn rmdir_removes_saved_query() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");
        vfs.attributes("queries/a").unwrap();

        vfs.remove_dir("queries/a").unwrap();
        assert!(vfs.store().saved_queries().unwrap().is_empty());
    }

    #[test]
    fn rename_updates_tag_listing() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "old");

        vfs.rename("tags/old", "tags/new").unwrap();

        let entries = vfs.read_dir(TAGS_DIR).unwrap();
        assert_eq!(names(&entries), vec!["new"]);
    }

    #[test]
    fn rename_outside_tags_is_not_permitted() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "old");

        assert!(matches!(
            vfs.rename("queries/old", "queries/new"),
            Err(VfsError::NotPermitted)
        ));
        assert!(matches!(
            vfs.rename("tags/old", "tags/a/b"),
            Err(VfsError::NotPermitted)
        ));
        assert!(matches!(
            vfs.rename("tags/ghost", "tags/new"),
            Err(VfsError::NotFound)
        ));
    }

    #[test]
    fn unlink_removes_only_parent_segment_association() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/x/doc.txt", "a");
        tag_file(&vfs, "/x/doc.txt", "b");

        vfs.unlink(&format!("tags/a/b/doc.{}.txt", file.id())).unwrap();

        let store = vfs.store();
        let a = store.tag_by_name("a").unwrap().unwrap();
        let b = store.tag_by_name("b").unwrap().unwrap();
        assert_eq!(store.file_tag_count_by_tag_id(a.id()).unwrap(), 1);
        assert_eq!(store.file_tag_count_by_tag_id(b.id()).unwrap(), 0);
    }

    #[test]
    fn unlink_of_non_link_name_is_not_permitted() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");

        assert!(matches!(
            vfs.unlink("tags/a/not-a-link"),
            Err(VfsError::NotPermitted)
        ));
    }

    #[test]
    fn unlink_under_queries_is_not_permitted() {
        let vfs = vfs();
        let file = tag_file(&vfs, "/x/doc.txt", "a");
        vfs.attributes("queries/a").unwrap();

        assert!(matches!(
            vfs.unlink(&format!("queries/a/doc.{}.txt", file.id())),
            Err(VfsError::NotPermitted)
        ));
    }

    #[test]
    fn unlink_of_vanished_file_reports_success() {
        let vfs = vfs();
        tag_file(&vfs, "/x/a", "a");

        // id 999 decodes but no record exists
        vfs.unlink("tags/a/gone.999.txt").unwrap();
    }
}
