//! Database schema and migrations for rssbot.
//!
//! Migrations are applied in order when the database is opened.
//! The schema_version table tracks which migrations have been applied.

/// Database migrations, one statement each.
pub const MIGRATIONS: &[&str] = &[
    // v1: per-channel key-value namespace
    r#"
CREATE TABLE kv_entries (
    channel     TEXT NOT NULL,
    entry_key   TEXT NOT NULL,
    entry_value TEXT NOT NULL,
    revision    INTEGER NOT NULL DEFAULT 1,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (channel, entry_key)
)
"#,
    // v2: listing a namespace scans by channel
    r#"
CREATE INDEX idx_kv_entries_channel ON kv_entries(channel)
"#,
];
