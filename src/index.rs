//! Listings, album groupings and single-item lookups
//!
//! Windowing runs through one of two paths that agree on semantics: stores
//! with native limit/offset get the window pushed down, everything else is
//! walked and skipped here. In both paths `has_more` is
//! `(offset + returned) < total_count`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{extension_for_mime, CacheStore};
use crate::error::LibraryError;
use crate::identifier::AssetIdentifier;
use crate::models::{Album, Asset, CachedFile, LibraryFilter, MediaType, Page, Window};
use crate::probe::MediaSource;
use crate::store::{MediaRecord, MediaSelection, MediaStore};
use crate::thumbnail;
use crate::worker::WorkerPool;

/// Query surface over the backing store and the artifact cache
pub struct AssetIndex {
    store: Arc<dyn MediaStore>,
    cache: Arc<CacheStore>,
    pool: WorkerPool,
}

impl AssetIndex {
    pub fn new(store: Arc<dyn MediaStore>, cache: Arc<CacheStore>, pool: WorkerPool) -> Self {
        Self { store, cache, pool }
    }

    /// All albums with their item counts, in first-seen listing order
    pub async fn list_albums(&self) -> Result<Vec<Album>, LibraryError> {
        let store = Arc::clone(&self.store);
        self.pool
            .run(move || {
                let memberships = store.album_memberships()?;

                let mut order: Vec<String> = Vec::new();
                let mut albums: HashMap<String, Album> = HashMap::new();
                for membership in memberships {
                    let album = albums
                        .entry(membership.album_id.clone())
                        .or_insert_with(|| {
                            order.push(membership.album_id.clone());
                            Album {
                                id: membership.album_id.clone(),
                                title: membership.title.unwrap_or_default(),
                                asset_count: 0,
                            }
                        });
                    album.asset_count += 1;
                }

                Ok(order
                    .into_iter()
                    .filter_map(|id| albums.remove(&id))
                    .collect())
            })
            .await
    }

    /// One page of assets matching `filter`
    pub async fn list_assets(
        &self,
        filter: &LibraryFilter,
        window: Window,
    ) -> Result<Page, LibraryError> {
        let selection = MediaSelection::new(filter.include_images, filter.include_videos);
        if selection.is_empty() {
            return Err(LibraryError::InvalidArgument(
                "at least one of images or videos must be requested".to_string(),
            ));
        }

        let store = Arc::clone(&self.store);
        let (total_count, records) = self
            .pool
            .run(move || {
                let total = store.count(selection)?;
                let records = if store.supports_native_window() {
                    store.query(selection, Some(window))?
                } else {
                    manual_window(store.query(selection, None)?, window)
                };
                Ok((total, records))
            })
            .await?;

        // Artifact generation dominates listing latency; run rows
        // concurrently on the bounded pool and reassemble in page order.
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            if !selection.matches(record.media_type) {
                log::debug!("skipping row {} outside requested media types", record.id);
                continue;
            }
            let store = Arc::clone(&self.store);
            let cache = Arc::clone(&self.cache);
            let pool = self.pool.clone();
            let filter = filter.clone();
            tasks.push(tokio::spawn(async move {
                build_asset(store, cache, pool, record, filter).await
            }));
        }

        let mut assets = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(asset) => assets.push(asset),
                Err(e) => log::warn!("listing row task failed: {}", e),
            }
        }

        let has_more = (window.offset as u64 + assets.len() as u64) < total_count;
        Ok(Page {
            assets,
            total_count,
            has_more,
        })
    }

    /// Full-resolution copy of one stored asset; `None` when the id does not
    /// resolve. I/O failures while copying are surfaced, not swallowed.
    pub async fn get_full_stored(
        &self,
        media_type: MediaType,
        id: i64,
    ) -> Result<Option<CachedFile>, LibraryError> {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        self.pool
            .run(move || {
                let Some(record) = store.find(media_type, id)? else {
                    return Ok(None);
                };
                let identifier = AssetIdentifier::stored(media_type, id).to_string();
                ensure_full(store.as_ref(), &cache, &record, &identifier).map(Some)
            })
            .await
    }

    /// Thumbnail of one stored asset; generation failures degrade to `None`
    /// because a missing preview does not mean the item does not exist
    pub async fn get_thumbnail_stored(
        &self,
        media_type: MediaType,
        id: i64,
        width: u32,
        height: u32,
        quality: f64,
    ) -> Result<Option<CachedFile>, LibraryError> {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        self.pool
            .run(move || {
                let Some(record) = store.find(media_type, id)? else {
                    return Ok(None);
                };
                let identifier = AssetIdentifier::stored(media_type, id).to_string();
                match ensure_thumbnail(
                    store.as_ref(),
                    &cache,
                    &record,
                    &identifier,
                    width,
                    height,
                    quality,
                ) {
                    Ok(file) => Ok(Some(file)),
                    Err(e) => {
                        log::warn!("thumbnail generation failed for {}: {}", identifier, e);
                        Ok(None)
                    }
                }
            })
            .await
    }
}

fn manual_window(records: Vec<MediaRecord>, window: Window) -> Vec<MediaRecord> {
    let limit = window.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    records
        .into_iter()
        .skip(window.offset as usize)
        .take(limit)
        .collect()
}

async fn build_asset(
    store: Arc<dyn MediaStore>,
    cache: Arc<CacheStore>,
    pool: WorkerPool,
    record: MediaRecord,
    filter: LibraryFilter,
) -> Asset {
    let identifier = AssetIdentifier::stored(record.media_type, record.id).to_string();
    let mut asset = asset_from_record(&record, &identifier, filter.include_album_data);

    if filter.thumbnail_width > 0 && filter.thumbnail_height > 0 {
        let store = Arc::clone(&store);
        let cache = Arc::clone(&cache);
        let record = record.clone();
        let id = identifier.clone();
        let (width, height, quality) = (
            filter.thumbnail_width,
            filter.thumbnail_height,
            filter.thumbnail_quality,
        );
        match pool
            .run(move || ensure_thumbnail(store.as_ref(), &cache, &record, &id, width, height, quality))
            .await
        {
            Ok(file) => asset.thumbnail = Some(file),
            Err(e) => log::debug!("no thumbnail for {}: {}", identifier, e),
        }
    }

    if filter.include_full_resolution_data {
        let store = Arc::clone(&store);
        let cache = Arc::clone(&cache);
        let record = record.clone();
        let id = identifier.clone();
        match pool
            .run(move || ensure_full(store.as_ref(), &cache, &record, &id))
            .await
        {
            Ok(file) => asset.file = Some(file),
            Err(e) => log::debug!("no full-resolution copy for {}: {}", identifier, e),
        }
    }

    asset
}

fn asset_from_record(record: &MediaRecord, identifier: &str, include_album_data: bool) -> Asset {
    let mime_type = record
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name = record.display_name.clone().unwrap_or_else(|| {
        format!(
            "{}{}",
            identifier,
            extension_for_mime(record.mime_type.as_deref())
        )
    });
    let duration = match record.media_type {
        MediaType::Video => record
            .duration_ms
            .filter(|ms| *ms > 0)
            .map(|ms| ms as f64 / 1000.0),
        MediaType::Image => None,
    };
    let album_ids = if include_album_data {
        record.album_id.clone().map(|id| vec![id])
    } else {
        None
    };

    Asset {
        id: identifier.to_string(),
        file_name,
        media_type: record.media_type,
        width: record.width,
        height: record.height,
        duration,
        mime_type,
        size: record.size,
        creation_date: record
            .date_taken
            .or(record.date_added)
            .map(|d| d.to_rfc3339()),
        modification_date: record.date_modified.map(|d| d.to_rfc3339()),
        album_ids,
        thumbnail: None,
        file: None,
    }
}

fn resolve_content_path(
    store: &dyn MediaStore,
    record: &MediaRecord,
) -> Result<PathBuf, LibraryError> {
    let path = match record.content_path.clone() {
        Some(path) => Some(path),
        None => store.content_path(record.media_type, record.id)?,
    };
    path.ok_or_else(LibraryError::asset_not_found)
}

pub(crate) fn ensure_thumbnail(
    store: &dyn MediaStore,
    cache: &CacheStore,
    record: &MediaRecord,
    identifier: &str,
    width: u32,
    height: u32,
    quality: f64,
) -> Result<CachedFile, LibraryError> {
    let target = cache.thumbnail_path(identifier, width, height, quality);
    let path = cache.ensure(&target, |out| {
        let content = resolve_content_path(store, record)?;
        let source = MediaSource::new(record.media_type, content);
        let frame = source.preview_frame().or_else(|err| {
            match store.preview_image(record.media_type, record.id) {
                Some(preview) => {
                    log::debug!("using store preview for {}", identifier);
                    crate::probe::open_image(&preview)
                }
                None => Err(err),
            }
        })?;
        thumbnail::write_scaled_jpeg(&frame, width, height, quality, out)
    })?;
    cache.resolved_file(&path, "image/jpeg")
}

pub(crate) fn ensure_full(
    store: &dyn MediaStore,
    cache: &CacheStore,
    record: &MediaRecord,
    identifier: &str,
) -> Result<CachedFile, LibraryError> {
    let target = cache.file_path(identifier, record.mime_type.as_deref());
    let path = cache.ensure(&target, |out| {
        let content = resolve_content_path(store, record)?;
        let mut reader = fs::File::open(&content)?;
        std::io::copy(&mut reader, out)?;
        Ok(())
    })?;
    cache.resolved_file(
        &path,
        record
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream"),
    )
}
