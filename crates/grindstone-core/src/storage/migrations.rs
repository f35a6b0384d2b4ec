//! Database schema migrations for grindstone.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: user aggregate and reward-bearing records.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                    TEXT PRIMARY KEY,
            name                  TEXT NOT NULL,
            xp                    INTEGER NOT NULL DEFAULT 0,
            level                 INTEGER NOT NULL DEFAULT 1,
            streak                INTEGER NOT NULL DEFAULT 0,
            last_active_on        TEXT,
            total_tasks_completed INTEGER NOT NULL DEFAULT 0,
            version               INTEGER NOT NULL DEFAULT 0,
            created_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id),
            title        TEXT NOT NULL,
            priority     TEXT NOT NULL DEFAULT 'medium',
            status       TEXT NOT NULL DEFAULT 'pending',
            xp_awarded   INTEGER NOT NULL DEFAULT 0,
            xp_deducted  INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS goals (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL REFERENCES users(id),
            title               TEXT NOT NULL,
            category            TEXT,
            deadline            TEXT,
            progress            INTEGER NOT NULL DEFAULT 0,
            milestones_rewarded INTEGER NOT NULL DEFAULT 0,
            completion_rewarded INTEGER NOT NULL DEFAULT 0,
            completed_at        TEXT,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL REFERENCES users(id),
            name              TEXT NOT NULL,
            streak            INTEGER NOT NULL DEFAULT 0,
            longest_streak    INTEGER NOT NULL DEFAULT 0,
            total_completions INTEGER NOT NULL DEFAULT 0,
            last_completed_on TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            habit_id TEXT NOT NULL REFERENCES habits(id),
            day      TEXT NOT NULL,
            PRIMARY KEY (habit_id, day)
        );

        CREATE TABLE IF NOT EXISTS focus_sessions (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id),
            label        TEXT NOT NULL DEFAULT '',
            duration_min INTEGER NOT NULL,
            dp_earned    INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL REFERENCES users(id),
            title         TEXT NOT NULL,
            duration_days INTEGER NOT NULL,
            dp_reward     INTEGER NOT NULL,
            check_ins     INTEGER NOT NULL DEFAULT 0,
            started_on    TEXT NOT NULL,
            completed     INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenge_checkins (
            challenge_id TEXT NOT NULL REFERENCES challenges(id),
            day          TEXT NOT NULL,
            PRIMARY KEY (challenge_id, day)
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_tasks_user_completed_at ON tasks(user_id, completed_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: append-only reward log and per-day bonus flags.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS reward_events (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    TEXT NOT NULL REFERENCES users(id),
            delta      INTEGER NOT NULL,
            reason     TEXT NOT NULL,
            source     TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_bonuses (
            user_id    TEXT NOT NULL REFERENCES users(id),
            day        TEXT NOT NULL,
            kind       TEXT NOT NULL,
            granted_at TEXT NOT NULL,
            PRIMARY KEY (user_id, day, kind)
        );

        CREATE INDEX IF NOT EXISTS idx_reward_events_user ON reward_events(user_id, id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
