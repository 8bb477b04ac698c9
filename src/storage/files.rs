use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params};

use super::Storage;
use crate::models::{File, FileId, FileTag, TagId, ValueId};

const FILE_COLUMNS: &str = "id, path, fingerprint, mod_time, size, is_dir";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File::new(
        FileId::new(row.get(0)?),
        row.get::<_, String>(1)?,
        row.get::<_, Option<String>>(2)?,
        row.get(3)?,
        row.get::<_, i64>(4)? as u64,
        row.get::<_, i64>(5)? != 0,
    ))
}

impl Storage {
    /// Returns the universe of all known files, ordered by ID.
    pub fn all_files(&self) -> Result<Vec<File>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare(&format!("SELECT {FILE_COLUMNS} FROM file ORDER BY id"))?;
        let files = statement
            .query_map([], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Looks up a file record by ID.
    pub fn file_by_id(&self, id: FileId) -> Result<Option<File>> {
        let file = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM file WHERE id = ?1"),
                [id.get()],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    /// Looks up a file record by absolute path.
    pub fn file_by_path(&self, path: &Path) -> Result<Option<File>> {
        let path = path_text(path)?;
        let file = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM file WHERE path = ?1"),
                [path],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    /// Creates a file record for the given absolute path.
    pub fn add_file(
        &self,
        path: &Path,
        fingerprint: Option<&str>,
        mod_time: i64,
        size: u64,
        is_dir: bool,
    ) -> Result<File> {
        let conn = self.db.connection();
        let text = path_text(path)?;
        conn.execute(
            "INSERT INTO file (path, fingerprint, mod_time, size, is_dir)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![text, fingerprint, mod_time, size as i64, is_dir as i64],
        )
        .with_context(|| format!("could not record file '{}'", path.display()))?;

        Ok(File::new(
            FileId::new(conn.last_insert_rowid()),
            text,
            fingerprint.map(String::from),
            mod_time,
            size,
            is_dir,
        ))
    }

    /// Refreshes the recorded metadata of an existing file record.
    pub fn update_file(
        &self,
        id: FileId,
        fingerprint: Option<&str>,
        mod_time: i64,
        size: u64,
        is_dir: bool,
    ) -> Result<()> {
        self.db.connection().execute(
            "UPDATE file SET fingerprint = ?1, mod_time = ?2, size = ?3, is_dir = ?4
             WHERE id = ?5",
            params![fingerprint, mod_time, size as i64, is_dir as i64, id.get()],
        )?;
        Ok(())
    }

    /// Returns the files having at least one association with the tag,
    /// any value, ordered by ID.
    pub fn files_with_tag(&self, tag_id: TagId) -> Result<Vec<File>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM file
             WHERE id IN (SELECT file_id FROM file_tag WHERE tag_id = ?1)
             ORDER BY id"
        ))?;
        let files = statement
            .query_map([tag_id.get()], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Returns every association of the given file.
    pub fn file_tags_by_file_id(&self, file_id: FileId) -> Result<Vec<FileTag>> {
        let conn = self.db.connection();
        let mut statement =
            conn.prepare("SELECT file_id, tag_id, value_id FROM file_tag WHERE file_id = ?1")?;
        let file_tags = statement
            .query_map([file_id.get()], |row| {
                Ok(FileTag::new(
                    FileId::new(row.get(0)?),
                    TagId::new(row.get(1)?),
                    ValueId::new(row.get(2)?),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(file_tags)
    }

    /// Records an association. Duplicate triples are ignored.
    pub fn add_file_tag(&self, file_id: FileId, tag_id: TagId, value_id: ValueId) -> Result<()> {
        self.db.connection().execute(
            "INSERT OR IGNORE INTO file_tag (file_id, tag_id, value_id) VALUES (?1, ?2, ?3)",
            params![file_id.get(), tag_id.get(), value_id.get()],
        )?;
        Ok(())
    }

    /// Deletes one exact (file, tag, value) triple.
    pub fn delete_file_tag(&self, file_id: FileId, tag_id: TagId, value_id: ValueId) -> Result<()> {
        self.db.connection().execute(
            "DELETE FROM file_tag WHERE file_id = ?1 AND tag_id = ?2 AND value_id = ?3",
            params![file_id.get(), tag_id.get(), value_id.get()],
        )?;
        Ok(())
    }

    /// Deletes every association between the file and the tag,
    /// regardless of value.
    pub fn delete_file_tags(&self, file_id: FileId, tag_id: TagId) -> Result<()> {
        self.db.connection().execute(
            "DELETE FROM file_tag WHERE file_id = ?1 AND tag_id = ?2",
            params![file_id.get(), tag_id.get()],
        )?;
        Ok(())
    }
}

fn path_text(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path '{}' is not valid UTF-8", path.display()))
}
