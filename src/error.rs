use std::fmt;

/// Central error types for photo library operations
#[derive(Debug)]
pub enum LibraryError {
    /// Authorization gate denied access to media data
    PermissionDenied(String),
    /// Identifier does not resolve to an asset
    NotFound(String),
    /// Required parameter missing or malformed
    InvalidArgument(String),
    /// Stream read/write error during copy or generation
    Io(std::io::Error),
    /// Backing store query error
    Database(rusqlite::Error),
    /// Image decode/encode error during generation
    ImageProcessing(String),
    /// A pick operation is already running
    OperationInProgress(String),
    /// General error
    Other(String),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            LibraryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            LibraryError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            LibraryError::Io(e) => write!(f, "IO error: {}", e),
            LibraryError::Database(e) => write!(f, "Database error: {}", e),
            LibraryError::ImageProcessing(msg) => write!(f, "Image processing error: {}", msg),
            LibraryError::OperationInProgress(msg) => write!(f, "Operation in progress: {}", msg),
            LibraryError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(e: std::io::Error) -> Self {
        LibraryError::Io(e)
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(e: rusqlite::Error) -> Self {
        LibraryError::Database(e)
    }
}

impl LibraryError {
    /// Standard message for a denied authorization gate
    pub fn permission() -> Self {
        LibraryError::PermissionDenied(
            "this application is not allowed to access photo data".to_string(),
        )
    }

    /// Standard message for an unresolvable asset identifier
    pub fn asset_not_found() -> Self {
        LibraryError::NotFound("asset not found".to_string())
    }
}
