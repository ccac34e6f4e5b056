// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image database backed by SQLite.
//
// Every upload is kept as an "unprocessed" record; the pipeline stores its
// rendered output as a "processed" record and links the two. Producers and
// the worker share one store, so the connection sits behind a mutex.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info, instrument};

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{ImageId, StoredImage};

/// Storage seam between the pipeline and the image database.
pub trait ImageStore: Send + Sync {
    /// Insert a new record. Fails if the id is already taken.
    fn insert(&self, image: &StoredImage) -> Result<()>;

    /// Fetch a record including its payload.
    fn get(&self, id: &ImageId) -> Result<Option<StoredImage>>;

    /// Point `original` at its processed rendering.
    fn link_processed(&self, original: &ImageId, processed: &ImageId) -> Result<()>;

    /// List records without their payloads, oldest first.
    fn list(&self, query: &ListQuery) -> Result<ImagePage>;

    /// Number of records, optionally restricted to (un)processed ones.
    fn count(&self, processed: Option<bool>) -> Result<u64>;
}

/// Paging and filtering for [`ImageStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: u64,
    /// `None` lists every record from `offset` on.
    pub limit: Option<u64>,
    pub processed: Option<bool>,
}

/// One page of listed records.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePage {
    pub offset: u64,
    pub limit: Option<u64>,
    /// Matching records across all pages.
    pub total: u64,
    pub images: Vec<StoredImage>,
}

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS images (
        id TEXT PRIMARY KEY,
        format TEXT NOT NULL,
        public INTEGER NOT NULL DEFAULT 0,
        name TEXT,
        created_at TEXT NOT NULL,
        digest TEXT NOT NULL,
        is_processed INTEGER NOT NULL DEFAULT 0,
        unprocessed TEXT,
        processed TEXT,
        data BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS images_created_at ON images (created_at);
"#;

/// Column list shared by every SELECT; `data` must stay last.
const COLUMNS: &str =
    "id, format, public, name, created_at, digest, is_processed, unprocessed, processed";

/// SQLite implementation of [`ImageStore`].
///
/// `rusqlite` is synchronous. In an async context, wrap calls in
/// `tokio::task::spawn_blocking`.
pub struct SqliteImageStore {
    conn: Mutex<Connection>,
}

impl SqliteImageStore {
    /// Open (or create) the image database at the given path in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| LabelwerkError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| LabelwerkError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| LabelwerkError::Database(format!("create table: {e}")))?;

        info!("image database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for tests and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LabelwerkError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| LabelwerkError::Database(format!("create table: {e}")))?;

        debug!("in-memory image database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LabelwerkError::Database("connection lock poisoned".into()))
    }
}

impl ImageStore for SqliteImageStore {
    #[instrument(skip(self, image), fields(image_id = %image.id, bytes = image.data.len()))]
    fn insert(&self, image: &StoredImage) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO images (id, format, public, name, created_at, digest,
                 is_processed, unprocessed, processed, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    image.id.to_string(),
                    image.format,
                    image.public,
                    image.name,
                    image.created_at.to_rfc3339(),
                    image.digest,
                    image.is_processed,
                    image.unprocessed.map(|id| id.to_string()),
                    image.processed.map(|id| id.to_string()),
                    image.data,
                ],
            )
            .map_err(|e| LabelwerkError::Database(format!("insert image: {e}")))?;

        debug!(processed = image.is_processed, "image stored");
        Ok(())
    }

    #[instrument(skip(self), fields(image_id = %id))]
    fn get(&self, id: &ImageId) -> Result<Option<StoredImage>> {
        let sql = format!("SELECT {COLUMNS}, data FROM images WHERE id = ?1");
        self.conn()?
            .query_row(&sql, params![id.to_string()], |row| row_to_image(row, true))
            .optional()
            .map_err(|e| LabelwerkError::Database(format!("get image: {e}")))
    }

    #[instrument(skip(self), fields(original = %original, processed = %processed))]
    fn link_processed(&self, original: &ImageId, processed: &ImageId) -> Result<()> {
        let rows = self
            .conn()?
            .execute(
                "UPDATE images SET processed = ?1 WHERE id = ?2",
                params![processed.to_string(), original.to_string()],
            )
            .map_err(|e| LabelwerkError::Database(format!("link image: {e}")))?;

        if rows == 0 {
            return Err(LabelwerkError::NotFound(format!("image {original}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn list(&self, query: &ListQuery) -> Result<ImagePage> {
        let total = self.count(query.processed)?;

        // SQLite treats a negative LIMIT as "no limit".
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {COLUMNS} FROM images
             WHERE ?1 IS NULL OR is_processed = ?1
             ORDER BY created_at ASC, id ASC
             LIMIT ?2 OFFSET ?3"
        );
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| LabelwerkError::Database(format!("prepare list: {e}")))?;
        let images = stmt
            .query_map(params![query.processed, limit, offset], |row| {
                row_to_image(row, false)
            })
            .map_err(|e| LabelwerkError::Database(format!("query list: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LabelwerkError::Database(format!("collect rows: {e}")))?;

        debug!(count = images.len(), total, "listed images");
        Ok(ImagePage {
            offset: query.offset,
            limit: query.limit,
            total,
            images,
        })
    }

    fn count(&self, processed: Option<bool>) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM images WHERE ?1 IS NULL OR is_processed = ?1",
                params![processed],
                |row| row.get(0),
            )
            .map_err(|e| LabelwerkError::Database(format!("count images: {e}")))?;
        Ok(count.max(0) as u64)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_id(column: usize, text: &str) -> rusqlite::Result<ImageId> {
    uuid::Uuid::parse_str(text)
        .map(ImageId)
        .map_err(|e| conversion_error(column, e))
}

fn parse_optional_id(column: usize, text: Option<String>) -> rusqlite::Result<Option<ImageId>> {
    text.map(|t| parse_id(column, &t)).transpose()
}

/// Map a row selected with [`COLUMNS`] (plus `data` when `with_data`).
fn row_to_image(row: &rusqlite::Row<'_>, with_data: bool) -> rusqlite::Result<StoredImage> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(4, e))?;

    Ok(StoredImage {
        id: parse_id(0, &id)?,
        format: row.get(1)?,
        public: row.get(2)?,
        name: row.get(3)?,
        created_at,
        digest: row.get(5)?,
        is_processed: row.get(6)?,
        unprocessed: parse_optional_id(7, row.get(7)?)?,
        processed: parse_optional_id(8, row.get(8)?)?,
        data: if with_data { row.get(9)? } else { Vec::new() },
    })
}
