//! Ingestion of externally picked media
//!
//! Each reference is copied into the cache as a stream, probed for
//! dimensions, registered as an ephemeral pick and given an eager
//! thumbnail. Failures after the copy roll the item back completely: no
//! registry entry, no orphaned cache file. Only one pick batch may be in
//! flight at a time; a second caller is rejected, never queued.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cache::{extension_for_mime, CacheStore};
use crate::error::LibraryError;
use crate::identifier::AssetIdentifier;
use crate::models::{Asset, CachedFile, MediaType, PickOptions, PickedSource};
use crate::picked::{PickedItem, PickedItemRegistry};
use crate::probe::MediaSource;
use crate::thumbnail;
use crate::worker::WorkerPool;

pub struct IngestPipeline {
    cache: Arc<CacheStore>,
    registry: Arc<PickedItemRegistry>,
    pool: WorkerPool,
    pick_gate: Arc<Semaphore>,
}

impl IngestPipeline {
    pub fn new(
        cache: Arc<CacheStore>,
        registry: Arc<PickedItemRegistry>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            cache,
            registry,
            pool,
            pick_gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Ingest a batch of picked references
    ///
    /// Items that individually fail are skipped; the batch succeeds with
    /// whatever could be ingested.
    pub async fn pick(
        &self,
        sources: Vec<PickedSource>,
        options: &PickOptions,
    ) -> Result<Vec<Asset>, LibraryError> {
        let _in_flight = self.pick_gate.clone().try_acquire_owned().map_err(|_| {
            LibraryError::OperationInProgress(
                "another pick operation is already in progress".to_string(),
            )
        })?;

        let sources = if options.selection_limit > 0 && sources.len() > options.selection_limit {
            log::debug!(
                "dropping {} picked reference(s) beyond the selection limit",
                sources.len() - options.selection_limit
            );
            sources
                .into_iter()
                .take(options.selection_limit)
                .collect()
        } else {
            sources
        };

        let mut assets = Vec::with_capacity(sources.len());
        for source in sources {
            let location = source.location.clone();
            let cache = Arc::clone(&self.cache);
            let registry = Arc::clone(&self.registry);
            let options = options.clone();
            match self
                .pool
                .run(move || ingest_one(&cache, &registry, &source, &options))
                .await
            {
                Ok(asset) => assets.push(asset),
                Err(e) => log::warn!("skipping picked item {}: {}", location.display(), e),
            }
        }

        log::info!("ingested {} picked item(s)", assets.len());
        Ok(assets)
    }
}

fn ingest_one(
    cache: &CacheStore,
    registry: &PickedItemRegistry,
    source: &PickedSource,
    options: &PickOptions,
) -> Result<Asset, LibraryError> {
    let mut reader = fs::File::open(&source.location)?;

    let media_type = match source.content_type.as_deref() {
        Some(declared) if declared.starts_with("video") => MediaType::Video,
        _ => MediaType::Image,
    };
    let identifier = AssetIdentifier::minted().to_string();

    // best-effort metadata from the source itself
    let display_name = source
        .location
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);
    let reported_size = reader.metadata().ok().map(|m| m.len()).filter(|s| *s > 0);

    let target = cache.file_path(&identifier, source.content_type.as_deref());
    let path = cache.ensure(&target, |out| {
        std::io::copy(&mut reader, out)?;
        Ok(())
    })?;

    let copied = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let size = if copied == 0 {
        reported_size.unwrap_or(0)
    } else {
        copied
    };
    let mime_type = source.content_type.clone().unwrap_or_else(|| match media_type {
        MediaType::Image => "image/jpeg".to_string(),
        MediaType::Video => "application/octet-stream".to_string(),
    });

    let extension = extension_for_mime(source.content_type.as_deref());
    let result = register_and_describe(
        cache,
        registry,
        &identifier,
        &path,
        media_type,
        &mime_type,
        display_name,
        &extension,
        size,
        options,
    );

    result.map_err(|e| {
        // the copy landed; roll the whole item back
        registry.remove(&identifier);
        if path.exists() {
            if let Err(remove_err) = fs::remove_file(&path) {
                log::warn!(
                    "failed to remove partial pick {}: {}",
                    path.display(),
                    remove_err
                );
            }
        }
        e
    })
}

#[allow(clippy::too_many_arguments)]
fn register_and_describe(
    cache: &CacheStore,
    registry: &PickedItemRegistry,
    identifier: &str,
    path: &Path,
    media_type: MediaType,
    mime_type: &str,
    display_name: Option<String>,
    extension: &str,
    size: u64,
    options: &PickOptions,
) -> Result<Asset, LibraryError> {
    // probe the local copy, not the original source
    let local = MediaSource::new(media_type, path.to_path_buf());
    let dimensions = local.probe()?;

    registry.insert(
        identifier.to_string(),
        PickedItem {
            file: path.to_path_buf(),
            mime_type: mime_type.to_string(),
            media_type,
        },
    );

    let thumbnail = if options.thumbnail_width > 0 && options.thumbnail_height > 0 {
        Some(ensure_picked_thumbnail(
            cache,
            &local,
            identifier,
            options.thumbnail_width,
            options.thumbnail_height,
            options.thumbnail_quality,
        )?)
    } else {
        None
    };

    let file = cache.resolved_file(path, mime_type)?;

    Ok(Asset {
        id: identifier.to_string(),
        file_name: display_name.unwrap_or_else(|| format!("{}{}", identifier, extension)),
        media_type,
        width: dimensions.width,
        height: dimensions.height,
        duration: dimensions.duration_seconds,
        mime_type: mime_type.to_string(),
        size,
        creation_date: None,
        modification_date: None,
        album_ids: None,
        thumbnail,
        file: Some(file),
    })
}

/// Thumbnail for an already-ingested pick, straight from its cached copy
pub(crate) fn ensure_picked_thumbnail(
    cache: &CacheStore,
    source: &MediaSource,
    identifier: &str,
    width: u32,
    height: u32,
    quality: f64,
) -> Result<CachedFile, LibraryError> {
    let target = cache.thumbnail_path(identifier, width, height, quality);
    let path = cache.ensure(&target, |out| {
        let frame = source.preview_frame()?;
        thumbnail::write_scaled_jpeg(&frame, width, height, quality, out)
    })?;
    cache.resolved_file(&path, "image/jpeg")
}
