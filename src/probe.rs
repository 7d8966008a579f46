//! Media probing and per-type source dispatch
//!
//! A [`MediaSource`] pairs a local file with its media type and exposes the
//! two capabilities the rest of the crate needs: probing dimensions and
//! extracting a preview frame. Images are probed from their header bytes
//! without a full decode; videos go through an `ffprobe` metadata pass and
//! an `ffmpeg` single-frame extraction, both as subprocesses.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, ImageReader};

use crate::error::LibraryError;
use crate::models::MediaType;

/// Probed dimensions, plus duration for videos
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: Option<f64>,
}

/// A local media file tagged with its type
#[derive(Debug, Clone)]
pub struct MediaSource {
    pub media_type: MediaType,
    pub path: PathBuf,
}

impl MediaSource {
    pub fn new(media_type: MediaType, path: impl Into<PathBuf>) -> Self {
        Self {
            media_type,
            path: path.into(),
        }
    }

    /// Probe width/height (and duration for videos) without a full decode
    pub fn probe(&self) -> Result<MediaDimensions, LibraryError> {
        match self.media_type {
            MediaType::Image => probe_image_bounds(&self.path),
            MediaType::Video => probe_video_metadata(&self.path),
        }
    }

    /// Produce a full raster to scale a thumbnail from
    ///
    /// For videos this is a representative frame, not the whole stream.
    pub fn preview_frame(&self) -> Result<DynamicImage, LibraryError> {
        match self.media_type {
            MediaType::Image => open_image(&self.path),
            MediaType::Video => extract_video_frame(&self.path),
        }
    }
}

/// Decode an image by sniffing its content; cached copies may carry an
/// extension that says nothing about the format.
pub(crate) fn open_image(path: &Path) -> Result<DynamicImage, LibraryError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            LibraryError::ImageProcessing(format!("failed to decode {}: {}", path.display(), e))
        })
}

fn probe_image_bounds(path: &Path) -> Result<MediaDimensions, LibraryError> {
    let (width, height) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| {
            LibraryError::ImageProcessing(format!(
                "failed to read bounds of {}: {}",
                path.display(),
                e
            ))
        })?;
    Ok(MediaDimensions {
        width,
        height,
        duration_seconds: None,
    })
}

fn probe_video_metadata(path: &Path) -> Result<MediaDimensions, LibraryError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| LibraryError::InvalidArgument("invalid video path".to_string()))?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
            "-select_streams",
            "v:0",
            path_str,
        ])
        .output()?;

    if !output.status.success() {
        return Err(LibraryError::ImageProcessing(format!(
            "ffprobe failed for {}",
            path.display()
        )));
    }

    let stdout = std::str::from_utf8(&output.stdout)
        .map_err(|_| LibraryError::ImageProcessing("invalid ffprobe output".to_string()))?;
    parse_ffprobe_output(stdout)
}

/// Parse the JSON `ffprobe` prints for the first video stream
///
/// Rotation of 90 or 270 degrees swaps the reported width and height, so
/// the caller sees display dimensions.
pub fn parse_ffprobe_output(json_str: &str) -> Result<MediaDimensions, LibraryError> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| LibraryError::ImageProcessing(format!("failed to parse ffprobe JSON: {}", e)))?;

    let stream = json["streams"]
        .as_array()
        .and_then(|streams| streams.first())
        .ok_or_else(|| LibraryError::ImageProcessing("no video stream found".to_string()))?;

    let mut width = stream["width"].as_u64().unwrap_or(0) as u32;
    let mut height = stream["height"].as_u64().unwrap_or(0) as u32;

    if rotation_of(stream).map(|r| r == 90 || r == 270).unwrap_or(false) {
        std::mem::swap(&mut width, &mut height);
    }

    let duration_seconds = stream["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            json["format"]["duration"]
                .as_str()
                .and_then(|d| d.parse::<f64>().ok())
        })
        .filter(|d| *d > 0.0);

    Ok(MediaDimensions {
        width,
        height,
        duration_seconds,
    })
}

/// Rotation in degrees, normalized to `0..360`
fn rotation_of(stream: &serde_json::Value) -> Option<i64> {
    let raw = stream["tags"]["rotate"]
        .as_str()
        .and_then(|r| r.parse::<i64>().ok())
        .or_else(|| {
            stream["side_data_list"]
                .as_array()?
                .iter()
                .find_map(|side_data| side_data["rotation"].as_i64())
        })?;
    Some(((raw % 360) + 360) % 360)
}

fn extract_video_frame(path: &Path) -> Result<DynamicImage, LibraryError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| LibraryError::InvalidArgument("invalid video path".to_string()))?;

    let staging = tempfile::tempdir()?;
    let frame_path = staging.path().join("frame.png");

    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-loglevel",
            "error",
            "-i",
            path_str,
            "-frames:v",
            "1",
        ])
        .arg(&frame_path)
        .status()?;

    if !status.success() || !frame_path.exists() {
        return Err(LibraryError::ImageProcessing(format!(
            "could not extract a frame from {}",
            path.display()
        )));
    }

    open_image(&frame_path)
}
