use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::Storage;
use crate::models::{Tag, TagId};

impl Storage {
    /// Returns every tag, ordered by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare("SELECT id, name FROM tag ORDER BY name")?;
        let tags = statement
            .query_map([], |row| {
                Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Returns the total number of tags.
    pub fn tag_count(&self) -> Result<u64> {
        let count: i64 =
            self.db
                .connection()
                .query_row("SELECT COUNT(*) FROM tag", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Looks up a tag by its unique name.
    pub fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .db
            .connection()
            .query_row("SELECT id, name FROM tag WHERE name = ?1", [name], |row| {
                Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
            })
            .optional()?;
        Ok(tag)
    }

    /// Looks up tags by name; names with no matching tag are simply
    /// absent from the result.
    pub fn tags_by_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();
        for name in names {
            if let Some(tag) = self.tag_by_name(name)? {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    /// Looks up tags by ID; unknown IDs are simply absent from the
    /// result.
    pub fn tags_by_ids(&self, ids: impl IntoIterator<Item = TagId>) -> Result<Vec<Tag>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare("SELECT id, name FROM tag WHERE id = ?1")?;

        let mut tags = Vec::new();
        for id in ids {
            let tag = statement
                .query_row([id.get()], |row| {
                    Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
                })
                .optional()?;
            if let Some(tag) = tag {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    /// Creates a new tag. Fails if the name is already taken.
    pub fn add_tag(&self, name: &str) -> Result<Tag> {
        let conn = self.db.connection();
        conn.execute("INSERT INTO tag (name) VALUES (?1)", [name])
            .with_context(|| format!("could not create tag '{name}'"))?;
        Ok(Tag::new(TagId::new(conn.last_insert_rowid()), name))
    }

    /// Renames a tag in place. Fails if the new name is already taken.
    pub fn rename_tag(&self, id: TagId, new_name: &str) -> Result<Tag> {
        self.db
            .connection()
            .execute(
                "UPDATE tag SET name = ?1 WHERE id = ?2",
                rusqlite::params![new_name, id.get()],
            )
            .with_context(|| format!("could not rename tag #{id} to '{new_name}'"))?;
        Ok(Tag::new(id, new_name))
    }

    /// Deletes a tag. The caller is responsible for checking that no
    /// association still references it.
    pub fn delete_tag(&self, id: TagId) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM tag WHERE id = ?1", [id.get()])?;
        Ok(())
    }

    /// Returns the number of associations referencing the tag.
    pub fn file_tag_count_by_tag_id(&self, id: TagId) -> Result<u64> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM file_tag WHERE tag_id = ?1",
            [id.get()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
