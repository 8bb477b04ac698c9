use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::Storage;
use crate::models::{Value, ValueId};

impl Storage {
    /// Looks up a value by ID. `ValueId::NONE` never matches.
    pub fn value_by_id(&self, id: ValueId) -> Result<Option<Value>> {
        let value = self
            .db
            .connection()
            .query_row(
                "SELECT id, name FROM value WHERE id = ?1",
                [id.get()],
                |row| {
                    Ok(Value::new(
                        ValueId::new(row.get(0)?),
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .optional()?;
        Ok(value)
    }

    /// Looks up a value by its unique name.
    pub fn value_by_name(&self, name: &str) -> Result<Option<Value>> {
        let value = self
            .db
            .connection()
            .query_row(
                "SELECT id, name FROM value WHERE name = ?1",
                [name],
                |row| {
                    Ok(Value::new(
                        ValueId::new(row.get(0)?),
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .optional()?;
        Ok(value)
    }

    /// Returns the value with the given name, creating it if absent.
    pub fn get_or_create_value(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.value_by_name(name)? {
            return Ok(value);
        }

        let conn = self.db.connection();
        conn.execute("INSERT INTO value (name) VALUES (?1)", [name])
            .with_context(|| format!("could not create value '{name}'"))?;
        Ok(Value::new(ValueId::new(conn.last_insert_rowid()), name))
    }
}
