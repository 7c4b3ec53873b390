//! SQL migration definitions for the scriptorium database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: liturgy_entries with season and order indexes",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Imported Liturgy of the Hours entries
CREATE TABLE IF NOT EXISTS liturgy_entries (
    id           TEXT PRIMARY KEY,
    season       TEXT NOT NULL,
    title        TEXT NOT NULL,
    entry_order  INTEGER NOT NULL,
    html_content TEXT NOT NULL,
    source_files TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_liturgy_entries_season ON liturgy_entries(season);
CREATE INDEX IF NOT EXISTS idx_liturgy_entries_order ON liturgy_entries(entry_order);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
