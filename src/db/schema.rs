/// Initial database schema.
///
/// All statements use IF NOT EXISTS so schema initialization can run
/// on every connection open.
pub const INITIAL_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file (
    id          INTEGER PRIMARY KEY,
    path        TEXT NOT NULL UNIQUE,
    fingerprint TEXT,
    mod_time    INTEGER NOT NULL DEFAULT 0,
    size        INTEGER NOT NULL DEFAULT 0,
    is_dir      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tag (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS value (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS file_tag (
    file_id  INTEGER NOT NULL,
    tag_id   INTEGER NOT NULL,
    value_id INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (file_id, tag_id, value_id)
);

CREATE INDEX IF NOT EXISTS idx_file_tag_file ON file_tag (file_id);
CREATE INDEX IF NOT EXISTS idx_file_tag_tag ON file_tag (tag_id);

CREATE TABLE IF NOT EXISTS query (
    text TEXT PRIMARY KEY
);
";
