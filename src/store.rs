//! Backing media store
//!
//! The device catalog is consumed through the [`MediaStore`] trait so hosts
//! can plug in whatever catalog they have. [`SqliteMediaStore`] is the
//! bundled implementation: a `media_items` table with an idempotent,
//! versioned schema bootstrap. It supports native LIMIT/OFFSET windowing;
//! stores that do not can still be paged, the index walks and skips rows
//! itself.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::LibraryError;
use crate::models::{MediaType, Window};

/// Which media types a query should match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSelection {
    pub images: bool,
    pub videos: bool,
}

impl MediaSelection {
    pub fn new(images: bool, videos: bool) -> Self {
        Self { images, videos }
    }

    pub fn matches(&self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Image => self.images,
            MediaType::Video => self.videos,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.images && !self.videos
    }
}

/// One catalog row
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub id: i64,
    pub media_type: MediaType,
    pub mime_type: Option<String>,
    pub display_name: Option<String>,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub duration_ms: Option<u64>,
    pub date_taken: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub album_id: Option<String>,
    pub album_title: Option<String>,
    pub content_path: Option<PathBuf>,
}

/// Album membership of one catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMembership {
    pub album_id: String,
    pub title: Option<String>,
}

/// External catalog of device media items
///
/// Implementations must return rows newest first (capture date, falling back
/// to added date, descending; ties broken by descending id) and must support
/// offset-based iteration even when [`supports_native_window`] is false.
///
/// [`supports_native_window`]: MediaStore::supports_native_window
pub trait MediaStore: Send + Sync {
    /// Whether [`query`](MediaStore::query) honors a window natively
    fn supports_native_window(&self) -> bool;

    /// Matching rows in listing order; `window` is only passed to stores
    /// that support native windowing
    fn query(
        &self,
        selection: MediaSelection,
        window: Option<Window>,
    ) -> Result<Vec<MediaRecord>, LibraryError>;

    /// Count of matching rows, independent of any window
    fn count(&self, selection: MediaSelection) -> Result<u64, LibraryError>;

    /// Single-row lookup
    fn find(&self, media_type: MediaType, id: i64) -> Result<Option<MediaRecord>, LibraryError>;

    /// Album membership of every image and video row
    fn album_memberships(&self) -> Result<Vec<AlbumMembership>, LibraryError>;

    /// Resolve the content location of one row
    fn content_path(
        &self,
        media_type: MediaType,
        id: i64,
    ) -> Result<Option<PathBuf>, LibraryError>;

    /// Lower-resolution built-in preview, if the store has one
    fn preview_image(&self, _media_type: MediaType, _id: i64) -> Option<PathBuf> {
        None
    }
}

/// A new row for [`SqliteMediaStore::insert`]
#[derive(Debug, Clone)]
pub struct NewMediaItem {
    pub media_type: MediaType,
    pub mime_type: Option<String>,
    pub display_name: Option<String>,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub duration_ms: Option<u64>,
    pub date_taken: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub album_id: Option<String>,
    pub album_title: Option<String>,
    pub content_path: Option<PathBuf>,
    pub preview_path: Option<PathBuf>,
}

impl NewMediaItem {
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            mime_type: None,
            display_name: None,
            size: 0,
            width: 0,
            height: 0,
            duration_ms: None,
            date_taken: None,
            date_added: None,
            date_modified: None,
            album_id: None,
            album_title: None,
            content_path: None,
            preview_path: None,
        }
    }
}

const RECORD_COLUMNS: &str = "id, media_type, mime_type, display_name, size, width, height, \
     duration_ms, date_taken, date_added, date_modified, album_id, album_title, content_path";

/// SQLite-backed media catalog
pub struct SqliteMediaStore {
    conn: Mutex<Connection>,
}

impl SqliteMediaStore {
    /// Open (or create) a catalog database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let conn = Connection::open(path)?;
        init_media_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory catalog, useful for tests and ephemeral hosts
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;
        init_media_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LibraryError> {
        self.conn
            .lock()
            .map_err(|_| LibraryError::Other("media store connection poisoned".to_string()))
    }

    /// Register a media item; returns its row id
    pub fn insert(&self, item: &NewMediaItem) -> Result<i64, LibraryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO media_items (media_type, mime_type, display_name, size, width, height, \
             duration_ms, date_taken, date_added, date_modified, album_id, album_title, \
             content_path, preview_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                item.media_type.as_str(),
                item.mime_type,
                item.display_name,
                item.size as i64,
                item.width,
                item.height,
                item.duration_ms.map(|d| d as i64),
                item.date_taken,
                item.date_added,
                item.date_modified,
                item.album_id,
                item.album_title,
                item.content_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                item.preview_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn selection_clause(selection: MediaSelection) -> &'static str {
        match (selection.images, selection.videos) {
            (true, true) => "media_type IN ('image', 'video')",
            (true, false) => "media_type = 'image'",
            (false, true) => "media_type = 'video'",
            (false, false) => "0",
        }
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    let media_type: String = row.get(1)?;
    let media_type = match media_type.as_str() {
        "image" => MediaType::Image,
        "video" => MediaType::Video,
        _ => return Err(rusqlite::Error::InvalidQuery),
    };
    let content_path: Option<String> = row.get(13)?;
    Ok(MediaRecord {
        id: row.get(0)?,
        media_type,
        mime_type: row.get(2)?,
        display_name: row.get(3)?,
        size: row.get::<_, i64>(4)?.max(0) as u64,
        width: row.get(5)?,
        height: row.get(6)?,
        duration_ms: row.get::<_, Option<i64>>(7)?.map(|d| d.max(0) as u64),
        date_taken: row.get(8)?,
        date_added: row.get(9)?,
        date_modified: row.get(10)?,
        album_id: row.get(11)?,
        album_title: row.get(12)?,
        content_path: content_path.map(PathBuf::from),
    })
}

impl MediaStore for SqliteMediaStore {
    fn supports_native_window(&self) -> bool {
        true
    }

    fn query(
        &self,
        selection: MediaSelection,
        window: Option<Window>,
    ) -> Result<Vec<MediaRecord>, LibraryError> {
        if selection.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM media_items WHERE {} \
             ORDER BY COALESCE(date_taken, date_added) DESC, id DESC \
             LIMIT ?1 OFFSET ?2",
            RECORD_COLUMNS,
            Self::selection_clause(selection)
        );

        let (limit, offset) = match window {
            Some(w) => (w.limit.map(|l| l as i64).unwrap_or(-1), w.offset as i64),
            None => (-1, 0),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit, offset], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count(&self, selection: MediaSelection) -> Result<u64, LibraryError> {
        if selection.is_empty() {
            return Ok(0);
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM media_items WHERE {}",
            Self::selection_clause(selection)
        );
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn find(&self, media_type: MediaType, id: i64) -> Result<Option<MediaRecord>, LibraryError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM media_items WHERE id = ?1 AND media_type = ?2",
            RECORD_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![id, media_type.as_str()], record_from_row)
            .optional()?;
        Ok(record)
    }

    fn album_memberships(&self) -> Result<Vec<AlbumMembership>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT album_id, album_title FROM media_items \
             WHERE album_id IS NOT NULL AND media_type IN ('image', 'video') \
             ORDER BY COALESCE(date_taken, date_added) DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AlbumMembership {
                album_id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn content_path(
        &self,
        media_type: MediaType,
        id: i64,
    ) -> Result<Option<PathBuf>, LibraryError> {
        let conn = self.conn()?;
        let path: Option<String> = conn
            .query_row(
                "SELECT content_path FROM media_items WHERE id = ?1 AND media_type = ?2",
                params![id, media_type.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(path.map(PathBuf::from))
    }

    fn preview_image(&self, media_type: MediaType, id: i64) -> Option<PathBuf> {
        let conn = self.conn().ok()?;
        let path: Option<String> = conn
            .query_row(
                "SELECT preview_path FROM media_items WHERE id = ?1 AND media_type = ?2",
                params![id, media_type.as_str()],
                |row| row.get(0),
            )
            .optional()
            .ok()?
            .flatten();
        path.map(PathBuf::from)
    }
}

/// Initialize the media catalog schema; safe to call repeatedly
pub fn init_media_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS media_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM media_schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        create_media_schema_v1(conn)?;
        conn.execute("INSERT INTO media_schema_version (version) VALUES (1)", [])?;
    }

    Ok(())
}

fn create_media_schema_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS media_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            media_type TEXT NOT NULL CHECK(media_type IN ('image', 'video')),
            mime_type TEXT,
            display_name TEXT,
            size INTEGER NOT NULL DEFAULT 0,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER,
            date_taken TEXT,
            date_added TEXT,
            date_modified TEXT,
            album_id TEXT,
            album_title TEXT,
            content_path TEXT,
            preview_path TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_media_items_listing
         ON media_items (date_taken DESC, id DESC)",
        [],
    )?;

    Ok(())
}
