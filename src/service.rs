//! Service facade wiring the library together
//!
//! The service enforces the authorization gate, keeps all blocking work on
//! the bounded pool and hands back the result objects the transport layer
//! expects. Cache directories are bootstrapped once at construction.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::error::LibraryError;
use crate::identifier::AssetIdentifier;
use crate::index::AssetIndex;
use crate::ingest::{self, IngestPipeline};
use crate::models::{
    AlbumList, AuthState, AuthStatus, CachedFile, LibraryFilter, Page, PickOptions, PickResult,
    PickedSource, Window,
};
use crate::picked::PickedItemRegistry;
use crate::probe::MediaSource;
use crate::store::MediaStore;
use crate::worker::WorkerPool;

/// External authorization decision for media access
pub trait AuthorizationGate: Send + Sync {
    fn is_authorized(&self) -> bool;
}

/// Gate for embedding contexts that handle permissions upstream
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAuthorized;

impl AuthorizationGate for AlwaysAuthorized {
    fn is_authorized(&self) -> bool {
        true
    }
}

/// Configuration for service initialization
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Private cache root; `thumbnails/` and `files/` are created beneath it
    pub cache_root: PathBuf,
    /// Size of the blocking worker pool
    pub worker_threads: usize,
    /// Local HTTP origin for web paths, when the host serves cache files
    pub local_url: Option<String>,
}

impl LibraryConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            worker_threads: 2,
            local_url: None,
        }
    }
}

/// Photo library service
pub struct PhotoLibraryService {
    gate: Arc<dyn AuthorizationGate>,
    cache: Arc<CacheStore>,
    registry: Arc<PickedItemRegistry>,
    index: AssetIndex,
    ingest: IngestPipeline,
    pool: WorkerPool,
}

impl PhotoLibraryService {
    pub fn new(
        config: LibraryConfig,
        store: Arc<dyn MediaStore>,
        gate: Arc<dyn AuthorizationGate>,
    ) -> Result<Self, LibraryError> {
        let cache = Arc::new(CacheStore::new(config.cache_root, config.local_url));
        cache.prepare_directories()?;

        let pool = WorkerPool::new(config.worker_threads);
        let registry = Arc::new(PickedItemRegistry::new());
        let index = AssetIndex::new(Arc::clone(&store), Arc::clone(&cache), pool.clone());
        let ingest = IngestPipeline::new(Arc::clone(&cache), Arc::clone(&registry), pool.clone());

        Ok(Self {
            gate,
            cache,
            registry,
            index,
            ingest,
            pool,
        })
    }

    /// Current authorization outcome, in the transport shape
    pub fn authorization_status(&self) -> AuthStatus {
        let state = if self.gate.is_authorized() {
            AuthState::Authorized
        } else {
            AuthState::Denied
        };
        AuthStatus { state }
    }

    fn check_authorized(&self) -> Result<(), LibraryError> {
        if self.gate.is_authorized() {
            Ok(())
        } else {
            Err(LibraryError::permission())
        }
    }

    /// All albums with their item counts
    pub async fn get_albums(&self) -> Result<AlbumList, LibraryError> {
        self.check_authorized()?;
        Ok(AlbumList {
            albums: self.index.list_albums().await?,
        })
    }

    /// One page of library assets
    pub async fn get_library(
        &self,
        filter: &LibraryFilter,
        window: Window,
    ) -> Result<Page, LibraryError> {
        self.check_authorized()?;
        self.index.list_assets(filter, window).await
    }

    /// Full-resolution file for one asset; picks resolve before the store
    pub async fn get_full_file(&self, identifier: &str) -> Result<CachedFile, LibraryError> {
        self.check_authorized()?;
        if identifier.is_empty() {
            return Err(LibraryError::InvalidArgument(
                "parameter 'id' is required".to_string(),
            ));
        }

        if let Some(picked) = self.registry.get(identifier) {
            let cache = Arc::clone(&self.cache);
            return self
                .pool
                .run(move || cache.resolved_file(&picked.file, &picked.mime_type))
                .await;
        }

        match AssetIdentifier::parse(identifier) {
            Some(AssetIdentifier::Stored { media_type, id }) => self
                .index
                .get_full_stored(media_type, id)
                .await?
                .ok_or_else(LibraryError::asset_not_found),
            _ => Err(LibraryError::asset_not_found()),
        }
    }

    /// Thumbnail file for one asset; picks resolve before the store
    ///
    /// Non-positive dimensions and generation failures both read as "asset
    /// not found"; a missing preview never fails the asset itself.
    pub async fn get_thumbnail_file(
        &self,
        identifier: &str,
        width: u32,
        height: u32,
        quality: f64,
    ) -> Result<CachedFile, LibraryError> {
        self.check_authorized()?;
        if identifier.is_empty() {
            return Err(LibraryError::InvalidArgument(
                "parameter 'id' is required".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(LibraryError::asset_not_found());
        }

        if let Some(picked) = self.registry.get(identifier) {
            let cache = Arc::clone(&self.cache);
            let id = identifier.to_string();
            return self
                .pool
                .run(move || {
                    let source = MediaSource::new(picked.media_type, picked.file.clone());
                    ingest::ensure_picked_thumbnail(&cache, &source, &id, width, height, quality)
                })
                .await
                .map_err(|e| {
                    log::warn!("thumbnail generation failed for {}: {}", identifier, e);
                    LibraryError::asset_not_found()
                });
        }

        match AssetIdentifier::parse(identifier) {
            Some(AssetIdentifier::Stored { media_type, id }) => self
                .index
                .get_thumbnail_stored(media_type, id, width, height, quality)
                .await?
                .ok_or_else(LibraryError::asset_not_found),
            _ => Err(LibraryError::asset_not_found()),
        }
    }

    /// Ingest externally picked references into the cache
    pub async fn pick_media(
        &self,
        sources: Vec<PickedSource>,
        options: &PickOptions,
    ) -> Result<PickResult, LibraryError> {
        let assets = self.ingest.pick(sources, options).await?;
        Ok(PickResult { assets })
    }

    /// Registry of picks ingested during this process lifetime
    pub fn picked_items(&self) -> &PickedItemRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use crate::store::{NewMediaItem, SqliteMediaStore};
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    struct DeniedGate;

    impl AuthorizationGate for DeniedGate {
        fn is_authorized(&self) -> bool {
            false
        }
    }

    fn seeded_store(content_dir: &Path, count: u32) -> (Arc<SqliteMediaStore>, Vec<i64>) {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..count {
            let path = content_dir.join(format!("img_{}.png", i));
            image::RgbImage::from_pixel(100, 50, image::Rgb([40, 40, 40]))
                .save(&path)
                .unwrap();

            let mut item = NewMediaItem::new(MediaType::Image);
            item.mime_type = Some("image/png".to_string());
            item.display_name = Some(format!("IMG_{:04}.png", i));
            item.date_taken = Some(Utc.with_ymd_and_hms(2024, 7, 1, 8, i, 0).unwrap());
            item.content_path = Some(path);
            item.size = 1000 + i as u64;
            ids.push(store.insert(&item).unwrap());
        }
        (Arc::new(store), ids)
    }

    fn service_with(
        store: Arc<SqliteMediaStore>,
        gate: Arc<dyn AuthorizationGate>,
    ) -> (PhotoLibraryService, tempfile::TempDir) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let service = PhotoLibraryService::new(
            LibraryConfig::new(dir.path().join("photoLibrary")),
            store,
            gate,
        )
        .unwrap();
        (service, dir)
    }

    #[tokio::test]
    async fn denied_gate_blocks_listing_and_fetching() {
        let content = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(content.path(), 1);
        let (service, _dir) = service_with(store, Arc::new(DeniedGate));

        assert_eq!(service.authorization_status().state, AuthState::Denied);

        let listing = service
            .get_library(&LibraryFilter::default(), Window::default())
            .await;
        assert!(matches!(listing, Err(LibraryError::PermissionDenied(_))));
        assert!(matches!(
            service.get_albums().await,
            Err(LibraryError::PermissionDenied(_))
        ));
        assert!(matches!(
            service.get_full_file(&format!("image:{}", ids[0])).await,
            Err(LibraryError::PermissionDenied(_))
        ));
        assert!(matches!(
            service
                .get_thumbnail_file(&format!("image:{}", ids[0]), 64, 64, 0.8)
                .await,
            Err(LibraryError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn pages_a_seeded_library() {
        let content = tempfile::tempdir().unwrap();
        let (store, _ids) = seeded_store(content.path(), 10);
        let (service, _dir) = service_with(store, Arc::new(AlwaysAuthorized));

        let filter = LibraryFilter {
            thumbnail_width: 0,
            thumbnail_height: 0,
            ..LibraryFilter::default()
        };
        let page = service
            .get_library(&filter, Window::new(Some(4), 2))
            .await
            .unwrap();

        assert_eq!(page.total_count, 10);
        assert_eq!(page.assets.len(), 4);
        assert!(page.has_more);
        assert_eq!(page.assets[0].file_name, "IMG_0007.png");
    }

    #[tokio::test]
    async fn resolves_stored_files_and_thumbnails() {
        let content = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(content.path(), 1);
        let (service, _dir) = service_with(store, Arc::new(AlwaysAuthorized));
        let identifier = format!("image:{}", ids[0]);

        let full = service.get_full_file(&identifier).await.unwrap();
        assert!(full.path.ends_with(".png"));
        assert_eq!(full.mime_type, "image/png");
        assert!(full.web_path.starts_with("file://"));

        let thumb = service
            .get_thumbnail_file(&identifier, 40, 40, 0.8)
            .await
            .unwrap();
        let decoded = image::open(&thumb.path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[tokio::test]
    async fn invalid_requests_map_to_the_error_taxonomy() {
        let content = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(content.path(), 1);
        let (service, _dir) = service_with(store, Arc::new(AlwaysAuthorized));
        let identifier = format!("image:{}", ids[0]);

        // a required parameter is missing
        assert!(matches!(
            service.get_full_file("").await,
            Err(LibraryError::InvalidArgument(_))
        ));
        // malformed identifiers read as missing assets, not as failures
        assert!(matches!(
            service.get_full_file("foo").await,
            Err(LibraryError::NotFound(_))
        ));
        assert!(matches!(
            service.get_full_file("image:abc").await,
            Err(LibraryError::NotFound(_))
        ));
        // unknown id
        assert!(matches!(
            service.get_full_file("image:424242").await,
            Err(LibraryError::NotFound(_))
        ));
        // zero-sized thumbnails are an invalid request reading as not found
        assert!(matches!(
            service.get_thumbnail_file(&identifier, 0, 64, 0.8).await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn picked_items_resolve_before_the_store() {
        let content = tempfile::tempdir().unwrap();
        let (store, _ids) = seeded_store(content.path(), 1);
        let (service, _dir) = service_with(store, Arc::new(AlwaysAuthorized));

        let source = content.path().join("picked.png");
        image::RgbImage::from_pixel(90, 30, image::Rgb([1, 2, 3]))
            .save(&source)
            .unwrap();

        let picked = service
            .pick_media(
                vec![PickedSource::new(&source, Some("image/png".to_string()))],
                &PickOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(picked.assets.len(), 1);
        let identifier = picked.assets[0].id.clone();
        assert_eq!(service.picked_items().len(), 1);

        let full = service.get_full_file(&identifier).await.unwrap();
        assert_eq!(
            full.path,
            picked.assets[0].file.as_ref().unwrap().path
        );

        let thumb = service
            .get_thumbnail_file(&identifier, 30, 30, 0.9)
            .await
            .unwrap();
        let decoded = image::open(&thumb.path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 10));

        // an unknown pick still reads as not found
        assert!(matches!(
            service
                .get_full_file("picked:00000000-0000-4000-8000-000000000000")
                .await,
            Err(LibraryError::NotFound(_))
        ));
    }
}
