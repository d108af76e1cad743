//! Table definitions for one simulation's SQLite file.
//!
//! One file per simulation, same layout as the source's SQLAlchemy models
//! in `app/database.py`: `simulation_metadata`, `accounts`, `balance_entries`,
//! `funding_rules`.

use rusqlite::Connection;

pub const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS simulation_metadata (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    start_datetime TEXT NOT NULL,
    end_datetime TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS funding_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_type TEXT NOT NULL,
    target_account_id INTEGER NOT NULL REFERENCES accounts(id),
    source_account_id INTEGER NOT NULL REFERENCES accounts(id),
    time_of_day TEXT NOT NULL,
    currency TEXT NOT NULL,
    threshold REAL NOT NULL DEFAULT 0.0,
    target_amount REAL NOT NULL DEFAULT 0.0
);

CREATE TABLE IF NOT EXISTS balance_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    amount REAL NOT NULL,
    currency TEXT NOT NULL,
    description TEXT,
    effective_time TEXT NOT NULL,
    rule_id INTEGER REFERENCES funding_rules(id)
);

CREATE INDEX IF NOT EXISTS idx_balance_entries_account_currency
    ON balance_entries(account_id, currency, effective_time);

CREATE INDEX IF NOT EXISTS idx_balance_entries_rule
    ON balance_entries(rule_id);

CREATE INDEX IF NOT EXISTS idx_balance_entries_ordering
    ON balance_entries(effective_time, account_id, id);
"#;

pub fn ensure_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
