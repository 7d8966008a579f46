use serde::Serialize;
use std::path::PathBuf;

/// Kind of a library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// A file resolved from the cache, in the shape the transport layer expects
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFile {
    pub path: String,
    pub web_path: String,
    pub mime_type: String,
    pub size: u64,
}

/// One library item as returned by listings, fetches and picks
///
/// Reconstructed fresh per query; never cached in memory beyond a single
/// request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub file_name: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub mime_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<CachedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<CachedFile>,
}

/// An album grouping with its item count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    pub asset_count: u64,
}

/// Result of a `getAlbums` call
#[derive(Debug, Clone, Serialize)]
pub struct AlbumList {
    pub albums: Vec<Album>,
}

/// Selection and enrichment options for a listing query
#[derive(Debug, Clone)]
pub struct LibraryFilter {
    pub include_images: bool,
    pub include_videos: bool,
    pub include_album_data: bool,
    pub include_full_resolution_data: bool,
    /// Thumbnail bounds; 0 in either dimension disables thumbnails
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// JPEG quality in `0.0..=1.0`
    pub thumbnail_quality: f64,
}

impl Default for LibraryFilter {
    fn default() -> Self {
        Self {
            include_images: true,
            include_videos: true,
            include_album_data: false,
            include_full_resolution_data: false,
            thumbnail_width: 256,
            thumbnail_height: 256,
            thumbnail_quality: 0.8,
        }
    }
}

/// A `(limit, offset)` subrange of an ordered result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Window {
    pub fn new(limit: Option<u32>, offset: u32) -> Self {
        Self { limit, offset }
    }
}

/// One page of a listing query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub assets: Vec<Asset>,
    pub total_count: u64,
    pub has_more: bool,
}

/// Options for ingesting externally picked files
#[derive(Debug, Clone)]
pub struct PickOptions {
    pub include_images: bool,
    pub include_videos: bool,
    /// Maximum number of references to process; 0 means unlimited
    pub selection_limit: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_quality: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_videos: false,
            selection_limit: 0,
            thumbnail_width: 256,
            thumbnail_height: 256,
            thumbnail_quality: 0.8,
        }
    }
}

/// An externally supplied resource reference handed over by the picker UI
#[derive(Debug, Clone)]
pub struct PickedSource {
    pub location: PathBuf,
    /// Content type as declared by the source; probed when absent
    pub content_type: Option<String>,
}

impl PickedSource {
    pub fn new(location: impl Into<PathBuf>, content_type: Option<String>) -> Self {
        Self {
            location: location.into(),
            content_type,
        }
    }
}

/// Result of a pick operation
#[derive(Debug, Clone, Serialize)]
pub struct PickResult {
    pub assets: Vec<Asset>,
}

/// Authorization outcome as the transport layer expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Authorized,
    Denied,
}

/// Result of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub state: AuthState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_serializes_with_wire_field_names() {
        let asset = Asset {
            id: "image:7".to_string(),
            file_name: "IMG_0007.jpg".to_string(),
            media_type: MediaType::Image,
            width: 4000,
            height: 3000,
            duration: None,
            mime_type: "image/jpeg".to_string(),
            size: 123_456,
            creation_date: Some("2024-05-01T10:00:00+00:00".to_string()),
            modification_date: None,
            album_ids: Some(vec!["camera".to_string()]),
            thumbnail: None,
            file: None,
        };

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["id"], "image:7");
        assert_eq!(json["fileName"], "IMG_0007.jpg");
        assert_eq!(json["type"], "image");
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["creationDate"], "2024-05-01T10:00:00+00:00");
        assert_eq!(json["albumIds"][0], "camera");
        // absent optionals are omitted, not null
        assert!(json.get("duration").is_none());
        assert!(json.get("modificationDate").is_none());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn auth_status_serializes_state_string() {
        let json = serde_json::to_value(AuthStatus {
            state: AuthState::Denied,
        })
        .unwrap();
        assert_eq!(json["state"], "denied");
    }

    #[test]
    fn page_serializes_counts() {
        let page = Page {
            assets: vec![],
            total_count: 42,
            has_more: true,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 42);
        assert_eq!(json["hasMore"], true);
    }
}
