//! Storage collaborator: tag, value, file, association and saved-query
//! persistence over SQLite, plus the query-expression resolver.
//!
//! The projection engine holds a `Storage` handle and threads it into
//! every call; there is no ambient global state.

mod files;
mod queries;
mod resolve;
mod tags;
mod values;

use anyhow::Result;

use crate::db::Database;

/// High-level persistence operations over a [`Database`].
///
/// Reads are plain queries against the current state; mutations are
/// expected to run inside [`Storage::unit_of_work`] so each logical
/// change commits or rolls back as one.
pub struct Storage {
    db: Database,
}

impl Storage {
    /// Creates storage over the given database, taking ownership.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `work` inside a transaction that is guaranteed to finalize:
    /// commit on success, rollback on any error, including early
    /// returns via `?`.
    pub fn unit_of_work<T>(&self, work: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let conn = self.db.connection();
        conn.execute("BEGIN TRANSACTION", [])?;

        match work(self) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(error) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_of_work_commits_on_success() {
        let store = Storage::new(Database::in_memory().unwrap());

        store.unit_of_work(|store| store.add_tag("kept").map(|_| ())).unwrap();

        assert!(store.tag_by_name("kept").unwrap().is_some());
    }

    #[test]
    fn unit_of_work_rolls_back_on_error() {
        let store = Storage::new(Database::in_memory().unwrap());

        let result: Result<()> = store.unit_of_work(|store| {
            store.add_tag("discarded")?;
            anyhow::bail!("forced failure");
        });

        assert!(result.is_err());
        assert!(store.tag_by_name("discarded").unwrap().is_none());
    }
}
