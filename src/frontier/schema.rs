//! Database schema for the SQLite set store

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Members of every named set
CREATE TABLE IF NOT EXISTS set_members (
    set_key TEXT NOT NULL,
    member TEXT NOT NULL,
    UNIQUE(set_key, member)
);

CREATE INDEX IF NOT EXISTS idx_set_members_key ON set_members(set_key);

-- Plain string values (refill markers)
CREATE TABLE IF NOT EXISTS kv_values (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
