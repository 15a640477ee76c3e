//! Connection handling and schema management.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// Schema Version
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version.
///
/// Version 1 is the layout written by the first deployment (no expiry, no
/// re-authorization interval). Version 2 adds both columns and the unique
/// mapping index.
const SCHEMA_VERSION: i32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to the gatekeeper's SQLite database.
///
/// Cheap to clone; every clone serializes on the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open or create the database at `path`, migrating it to the current schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|_| StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf())))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {:?}", path);
        Ok(db)
    }

    /// Open a private in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// The schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Migrations
// ─────────────────────────────────────────────────────────────────────────────

fn migrate(conn: &Connection) -> Result<()> {
    let current: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current >= SCHEMA_VERSION {
        debug!("Schema up to date (version {})", current);
        return Ok(());
    }

    info!("Migrating schema from version {} to {}", current, SCHEMA_VERSION);

    // Matches what the first deployment created, so existing files open unchanged.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT,
            discriminator TEXT,
            access_token TEXT,
            refresh_token TEXT
        );

        CREATE TABLE IF NOT EXISTS guild (
            guild_id TEXT NOT NULL,
            unauth_role_id TEXT NOT NULL,
            auth_role_id TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| StoreError::Migration(format!("base tables: {}", e)))?;

    if current < 2 {
        migrate_v2(conn)?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    info!("Schema migrated (version {})", SCHEMA_VERSION);
    Ok(())
}

/// Migration v2: token expiry, re-authorization interval, unique mapping triple.
///
/// The first deployment's `guild` table may be untyped and hold INTEGER
/// snowflakes. Registry queries bind TEXT, and SQLite never compares INTEGER
/// 100 equal to TEXT '100', so the table is rebuilt with TEXT columns and
/// duplicate triples collapse to the earliest row.
fn migrate_v2(conn: &Connection) -> Result<()> {
    info!("Running migration v2: expiry and reauth columns");

    if !has_column(conn, "users", "expires_at") {
        conn.execute_batch("ALTER TABLE users ADD COLUMN expires_at TEXT;")
            .map_err(|e| StoreError::Migration(format!("users.expires_at: {}", e)))?;
    }

    let reauth = if has_column(conn, "guild", "reauth_day") {
        "COALESCE(reauth_day, 30)"
    } else {
        "30"
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        r#"
        CREATE TABLE guild_v2 (
            guild_id TEXT NOT NULL,
            unauth_role_id TEXT NOT NULL,
            auth_role_id TEXT NOT NULL,
            reauth_day INTEGER NOT NULL DEFAULT 30
        );

        CREATE UNIQUE INDEX idx_guild_role_pair
            ON guild_v2(guild_id, unauth_role_id, auth_role_id);

        INSERT OR IGNORE INTO guild_v2 (guild_id, unauth_role_id, auth_role_id, reauth_day)
            SELECT CAST(guild_id AS TEXT), CAST(unauth_role_id AS TEXT), CAST(auth_role_id AS TEXT), {reauth}
            FROM guild
            WHERE guild_id IS NOT NULL AND unauth_role_id IS NOT NULL AND auth_role_id IS NOT NULL
            ORDER BY rowid;

        DROP TABLE guild;
        ALTER TABLE guild_v2 RENAME TO guild;

        CREATE INDEX IF NOT EXISTS idx_guild_roles
            ON guild(unauth_role_id, auth_role_id);
        "#,
        reauth = reauth
    ))
    .map_err(|e| StoreError::Migration(format!("guild table rebuild: {}", e)))?;
    tx.commit()?;

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("SELECT {} FROM {} LIMIT 0", column, table))
        .is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Read a snowflake column stored as TEXT or INTEGER.
pub(crate) fn column_id<T: From<u64>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw = match row.get_ref(idx)? {
        ValueRef::Integer(i) => u64::try_from(i).ok(),
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok()),
        other => {
            return Err(rusqlite::Error::InvalidColumnType(
                idx,
                format!("column {}", idx),
                other.data_type(),
            ));
        }
    };

    raw.map(T::from).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, "invalid snowflake".into())
    })
}

/// Read an optional RFC 3339 timestamp.
///
/// Missing or unreadable values become the Unix epoch so the owning token is
/// treated as expired and refreshed on next use.
pub(crate) fn column_expiry(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH))
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
