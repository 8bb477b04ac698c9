use anyhow::Result;

use super::Storage;
use crate::models::SavedQuery;

impl Storage {
    /// Returns every saved query, ordered by text.
    pub fn saved_queries(&self) -> Result<Vec<SavedQuery>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare("SELECT text FROM query ORDER BY text")?;
        let queries = statement
            .query_map([], |row| Ok(SavedQuery::new(row.get::<_, String>(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(queries)
    }

    /// Saves a query. Saving the same text twice is a no-op, so
    /// re-resolving an already-saved query never duplicates it.
    pub fn add_query(&self, text: &str) -> Result<()> {
        self.db
            .connection()
            .execute("INSERT OR IGNORE INTO query (text) VALUES (?1)", [text])?;
        Ok(())
    }

    /// Deletes a saved query. Deleting unknown text is a no-op.
    pub fn delete_query(&self, text: &str) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM query WHERE text = ?1", [text])?;
        Ok(())
    }
}
