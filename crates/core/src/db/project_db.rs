use std::path::Path;

use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::db::{BuildRunRecord, RunStatus};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Error type for build ledger operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed ledger of target builds.
#[derive(Debug)]
pub struct ProjectDb {
    conn: Connection,
}

const RUN_COLUMNS: &str = "target, architecture, processor, compiler, status, error, binary_path, \
     binary_hash, generated_path, kernel_count, overload_count, generated_changed, started_at, \
     finished_at";

impl ProjectDb {
    /// Open (or create) a ledger at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Ledger held in memory; handy for tests and dry runs.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// Insert a build run and return its row id.
    pub fn insert_build_run(&self, record: &BuildRunRecord) -> DbResult<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO build_runs ({RUN_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                record.target,
                record.architecture,
                record.processor,
                record.compiler,
                record.status.as_str(),
                record.error,
                record.binary_path,
                record.binary_hash,
                record.generated_path,
                record.kernel_count as i64,
                record.overload_count as i64,
                record.generated_changed,
                record.started_at,
                record.finished_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Build runs, newest first, optionally for one target only.
    pub fn list_build_runs(&self, target: Option<&str>) -> DbResult<Vec<BuildRunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM build_runs \
             WHERE ?1 IS NULL OR target = ?1 \
             ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map(params![target], row_to_run)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Most recent run for `target`.
    pub fn latest_build_run(&self, target: &str) -> DbResult<Option<BuildRunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM build_runs WHERE target = ?1 ORDER BY id DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![target])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_run(row)?))
        } else {
            Ok(None)
        }
    }
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<BuildRunRecord> {
    let status: String = row.get(4)?;
    let status = status.parse::<RunStatus>().map_err(|msg| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
        )
    })?;
    Ok(BuildRunRecord {
        target: row.get(0)?,
        architecture: row.get(1)?,
        processor: row.get(2)?,
        compiler: row.get(3)?,
        status,
        error: row.get(5)?,
        binary_path: row.get(6)?,
        binary_hash: row.get(7)?,
        generated_path: row.get(8)?,
        kernel_count: row.get::<_, i64>(9)? as usize,
        overload_count: row.get::<_, i64>(10)? as usize,
        generated_changed: row.get(11)?,
        started_at: row.get(12)?,
        finished_at: row.get(13)?,
    })
}

/// Apply schema migrations based on `PRAGMA user_version`.
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS build_runs (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                target            TEXT NOT NULL,
                architecture      TEXT NOT NULL,
                processor         TEXT,
                compiler          TEXT NOT NULL,
                status            TEXT NOT NULL,
                error             TEXT,
                binary_path       TEXT,
                binary_hash       TEXT,
                generated_path    TEXT,
                kernel_count      INTEGER NOT NULL DEFAULT 0,
                overload_count    INTEGER NOT NULL DEFAULT 0,
                generated_changed INTEGER NOT NULL DEFAULT 0,
                started_at        TEXT NOT NULL,
                finished_at       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_build_runs_target ON build_runs(target);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
