//! # Photo Library
//!
//! Device photo/video library access with an on-demand derived-artifact cache.
//!
//! This crate exposes a media catalog to a calling application:
//! - Paginated listings of images and videos, newest first
//! - Album groupings with per-album counts
//! - Content-addressed caching of thumbnails and full-resolution copies
//! - Ingestion of externally picked files into a private cache
//!
//! ## Collaborators
//!
//! Permissions, the system file picker and the transport layer stay outside
//! this crate. The authorization decision is consumed through the
//! [`AuthorizationGate`] trait and the device catalog through the
//! [`MediaStore`] trait; a SQLite-backed store is provided.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photo_library::{
//!     AlwaysAuthorized, LibraryConfig, PhotoLibraryService, SqliteMediaStore,
//! };
//!
//! let store = Arc::new(SqliteMediaStore::open("media.db")?);
//! let service = PhotoLibraryService::new(
//!     LibraryConfig::new("/path/to/cache"),
//!     store,
//!     Arc::new(AlwaysAuthorized),
//! )?;
//! ```

pub mod cache;
pub mod error;
pub mod identifier;
pub mod index;
pub mod ingest;
pub mod models;
pub mod picked;
pub mod probe;
pub mod service;
pub mod store;
pub mod thumbnail;
pub mod worker;

pub use cache::CacheStore;
pub use error::LibraryError;
pub use identifier::AssetIdentifier;
pub use index::AssetIndex;
pub use ingest::IngestPipeline;
pub use models::{
    Album, AlbumList, Asset, AuthState, AuthStatus, CachedFile, LibraryFilter, MediaType, Page,
    PickOptions, PickResult, PickedSource, Window,
};
pub use picked::{PickedItem, PickedItemRegistry};
pub use probe::{MediaDimensions, MediaSource};
pub use service::{AlwaysAuthorized, AuthorizationGate, LibraryConfig, PhotoLibraryService};
pub use store::{AlbumMembership, MediaRecord, MediaSelection, MediaStore, NewMediaItem, SqliteMediaStore};
pub use worker::WorkerPool;
