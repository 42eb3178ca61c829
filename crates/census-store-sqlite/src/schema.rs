//! SQL schema for the census SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never physically removed; deletion sets is_deleted.
CREATE TABLE IF NOT EXISTS people (
    person_id      TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    surname        TEXT NOT NULL,
    patronymic     TEXT,
    age            INTEGER,
    gender         TEXT,
    nationality    TEXT,
    name_key       TEXT NOT NULL,   -- lowercased name, for prefix search
    surname_key    TEXT NOT NULL,
    patronymic_key TEXT,
    created_at     TEXT NOT NULL,   -- RFC 3339 UTC, fixed precision
    updated_at     TEXT NOT NULL,
    is_deleted     INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS people_created_idx ON people(created_at);
CREATE INDEX IF NOT EXISTS people_surname_idx ON people(surname_key);

PRAGMA user_version = 1;
";
