use std::fmt;

use uuid::Uuid;

use crate::models::MediaType;

/// Stable textual handle for a library item or an ephemeral pick
///
/// Wire formats: `image:<numericId>`, `video:<numericId>`, `picked:<uuid>`.
/// Parsing is total: malformed strings yield `None`, which callers must
/// treat as "asset not found" rather than a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetIdentifier {
    Stored { media_type: MediaType, id: i64 },
    Picked(Uuid),
}

impl AssetIdentifier {
    pub fn stored(media_type: MediaType, id: i64) -> Self {
        AssetIdentifier::Stored { media_type, id }
    }

    /// Mint a fresh process-unique identifier for an ephemeral pick
    pub fn minted() -> Self {
        AssetIdentifier::Picked(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        if parts.len() != 2 {
            return None;
        }
        match parts[0] {
            "image" => parts[1]
                .parse::<i64>()
                .ok()
                .map(|id| AssetIdentifier::stored(MediaType::Image, id)),
            "video" => parts[1]
                .parse::<i64>()
                .ok()
                .map(|id| AssetIdentifier::stored(MediaType::Video, id)),
            "picked" => Uuid::parse_str(parts[1]).ok().map(AssetIdentifier::Picked),
            _ => None,
        }
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetIdentifier::Stored { media_type, id } => {
                write!(f, "{}:{}", media_type.as_str(), id)
            }
            AssetIdentifier::Picked(uuid) => write!(f, "picked:{}", uuid),
        }
    }
}
