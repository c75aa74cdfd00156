//! Database schema for the progress store

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per (domain, page URL) checkpoint
CREATE TABLE IF NOT EXISTS progress (
    domain_id TEXT NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (domain_id, url)
);

CREATE INDEX IF NOT EXISTS idx_progress_status ON progress(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
