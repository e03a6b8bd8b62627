use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use super::{NewUpload, UploadRecord};
use crate::error::{GradeError, GradeResult};

const SELECT_COLUMNS: &str = "SELECT id, image_path, verdict, created_at FROM uploads";

/// SQLite-backed upload history.
///
/// The connection sits behind a mutex so concurrent inserts cannot interleave
/// and corrupt the id sequence. Share it as `Arc<ResultStore>`.
pub struct ResultStore {
    conn: Mutex<Connection>,
}

impl ResultStore {
    /// Open or create the database file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> GradeResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GradeError::io("create data directory", e).with_path(parent.display().to_string())
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            GradeError::storage("open", e).with_context(path.display().to_string())
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path.display(), "upload history opened");
        Ok(store)
    }

    /// Private in-memory database, gone when the store is dropped.
    pub fn open_in_memory() -> GradeResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| GradeError::storage("open", e))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> GradeResult<()> {
        // AUTOINCREMENT keeps ids from being reused after delete_all
        self.lock()?
            .execute(
                "CREATE TABLE IF NOT EXISTS uploads (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    image_path  TEXT NOT NULL,
                    verdict     TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| GradeError::storage("create schema", e))?;
        Ok(())
    }

    fn lock(&self) -> GradeResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            GradeError::state("poisoned", "lock upload history", "a previous writer panicked")
        })
    }

    /// Append a record and return it with its assigned id.
    pub fn insert(&self, upload: NewUpload) -> GradeResult<UploadRecord> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let image_path = upload.image_path.to_string_lossy().into_owned();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO uploads (image_path, verdict, created_at) VALUES (?1, ?2, ?3)",
            params![image_path, upload.verdict, created_at],
        )
        .map_err(|e| GradeError::storage("insert", e))?;
        let id = conn.last_insert_rowid();
        debug!(id, "upload recorded");

        Ok(UploadRecord {
            id,
            image_path: upload.image_path,
            verdict: upload.verdict,
            created_at,
        })
    }

    /// The record with `id`, or `None` if there is none.
    pub fn get_by_id(&self, id: i64) -> GradeResult<Option<UploadRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1 LIMIT 1"),
            [id],
            row_to_record,
        )
        .optional()
        .map_err(|e| GradeError::storage("get by id", e))
    }

    /// Every record, newest first.
    pub fn get_all(&self) -> GradeResult<Vec<UploadRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC"))
            .map_err(|e| GradeError::storage("list", e))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| GradeError::storage("list", e))?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record.map_err(|e| GradeError::storage("list", e))?);
        }
        Ok(records)
    }

    /// The most recently inserted record, or `None` when the history is empty.
    pub fn get_latest(&self) -> GradeResult<Option<UploadRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"),
            [],
            row_to_record,
        )
        .optional()
        .map_err(|e| GradeError::storage("get latest", e))
    }

    /// Remove every record; returns how many were removed.
    pub fn delete_all(&self) -> GradeResult<usize> {
        let removed = self
            .lock()?
            .execute("DELETE FROM uploads", [])
            .map_err(|e| GradeError::storage("delete all", e))?;
        info!(removed, "upload history cleared");
        Ok(removed)
    }

    pub fn count(&self) -> GradeResult<i64> {
        self.lock()?
            .query_row("SELECT COUNT(*) FROM uploads", [], |row| row.get(0))
            .map_err(|e| GradeError::storage("count", e))
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<UploadRecord> {
    let image_path: String = row.get(1)?;
    Ok(UploadRecord {
        id: row.get(0)?,
        image_path: PathBuf::from(image_path),
        verdict: row.get(2)?,
        created_at: row.get(3)?,
    })
}
