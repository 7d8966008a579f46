//! Content-addressed cache for derived artifacts
//!
//! Every cache path is fully determined by the generation parameters: the
//! SHA-256 digest of the asset identifier plus, for thumbnails, the bounds
//! and quality. "Exists at path" is therefore equivalent to "already
//! generated". Content is a pure function of the key, so concurrent writers
//! need no lock; the last atomic rename wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::LibraryError;
use crate::models::CachedFile;

const THUMBNAIL_DIR: &str = "thumbnails";
const FILE_DIR: &str = "files";

/// On-disk store rooted at a private cache directory
#[derive(Debug)]
pub struct CacheStore {
    thumbnail_dir: PathBuf,
    file_dir: PathBuf,
    root: PathBuf,
    /// HTTP origin web paths are rewritten onto, when the host serves files
    local_url: Option<String>,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, local_url: Option<String>) -> Self {
        let root = root.into();
        Self {
            thumbnail_dir: root.join(THUMBNAIL_DIR),
            file_dir: root.join(FILE_DIR),
            root,
            local_url,
        }
    }

    /// Create the cache directories if absent; safe to call repeatedly
    pub fn prepare_directories(&self) -> Result<(), LibraryError> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(&self.thumbnail_dir)?;
        fs::create_dir_all(&self.file_dir)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for a thumbnail artifact
    pub fn thumbnail_path(&self, identifier: &str, width: u32, height: u32, quality: f64) -> PathBuf {
        let name = format!(
            "{}_{}x{}_q{}.jpg",
            digest(identifier),
            width,
            height,
            quality_percent(quality)
        );
        self.thumbnail_dir.join(name)
    }

    /// Deterministic path for a full-resolution copy
    pub fn file_path(&self, identifier: &str, mime_type: Option<&str>) -> PathBuf {
        let name = format!("{}{}", digest(identifier), extension_for_mime(mime_type));
        self.file_dir.join(name)
    }

    /// Return `target` if it already exists; otherwise run `generator` into a
    /// temporary file in the same directory and atomically rename it over
    /// `target`.
    pub fn ensure<F>(&self, target: &Path, generator: F) -> Result<PathBuf, LibraryError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), LibraryError>,
    {
        if target.exists() {
            log::debug!("cache hit: {}", target.display());
            return Ok(target.to_path_buf());
        }

        let dir = target.parent().ok_or_else(|| {
            LibraryError::Other(format!("cache target has no parent: {}", target.display()))
        })?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        generator(staged.as_file_mut())?;
        staged.as_file_mut().flush()?;
        staged
            .persist(target)
            .map_err(|e| LibraryError::Io(e.error))?;

        log::debug!("cache write: {}", target.display());
        Ok(target.to_path_buf())
    }

    /// Describe a cached file in the shape the transport layer expects
    pub fn resolved_file(&self, path: &Path, mime_type: &str) -> Result<CachedFile, LibraryError> {
        let size = fs::metadata(path)?.len();
        Ok(CachedFile {
            path: path.to_string_lossy().to_string(),
            web_path: self.portable_path(path),
            mime_type: mime_type.to_string(),
            size,
        })
    }

    /// Portable URL for a cached file; `file://` unless a local origin is set
    pub fn portable_path(&self, path: &Path) -> String {
        match &self.local_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path.display()),
            None => format!("file://{}", path.display()),
        }
    }
}

/// Hex-encoded SHA-256 of an identifier string
pub fn digest(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// JPEG quality as an integer percentage, clamped to `0..=100`
pub fn quality_percent(quality: f64) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// File extension for a declared mime type
pub fn extension_for_mime(mime_type: Option<&str>) -> String {
    match mime_type {
        None => ".dat".to_string(),
        Some("image/jpeg") => ".jpg".to_string(),
        Some("image/png") => ".png".to_string(),
        Some("image/gif") => ".gif".to_string(),
        Some("video/mp4") => ".mp4".to_string(),
        Some("video/quicktime") => ".mov".to_string(),
        Some(other) => {
            let subtype = other.rsplit('/').next().unwrap_or(other);
            if subtype.is_empty() {
                ".dat".to_string()
            } else {
                format!(".{}", subtype)
            }
        }
    }
}
