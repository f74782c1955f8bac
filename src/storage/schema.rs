//! Database schema definitions
//!
//! `url_queue` and `documents` are shared with external tools (seeding,
//! search), so column names and status strings are part of the contract.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl frontier: one row per known URL
CREATE TABLE IF NOT EXISTS url_queue (
    url TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'PENDING',
    retry_count INTEGER NOT NULL DEFAULT 0,
    fail_reason TEXT,
    claimed_at TEXT,
    claim_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_url_queue_status ON url_queue(status);

-- Extracted page content, append-only
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT,
    content TEXT,
    url TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_documents_url ON documents(url);
"#;

/// Initializes the database schema
///
/// Safe to run on every start; existing tables are left untouched apart from
/// adding `claim_id` to queues created before claims carried a token.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;

    let has_claim_id: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('url_queue') WHERE name = 'claim_id'",
        [],
        |row| row.get(0),
    )?;
    if has_claim_id == 0 {
        conn.execute_batch("ALTER TABLE url_queue ADD COLUMN claim_id TEXT;")?;
    }

    Ok(())
}
