//! Hot-folder camera.
//!
//! Tethering software (and most camera remote apps) drop each shot into a
//! directory as it is taken. [`FolderCamera`] treats that directory as the
//! live feed: capturing a frame takes the newest image in it, scales it to
//! fit the stream constraints, and re-encodes it as JPEG.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Find newest frame | `walkdir`, depth 1, by modification time |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Fit to constraints | `DynamicImage::resize` with `Lanczos3` |
//! | Encode | `image::codecs::jpeg::JpegEncoder` |

use super::{Camera, CaptureError, Constraints};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

pub struct FolderCamera {
    dir: PathBuf,
    quality: u8,
}

/// An open hot folder.
#[derive(Debug)]
pub struct FolderStream {
    dir: PathBuf,
    constraints: Constraints,
    frames: usize,
}

impl FolderCamera {
    /// `quality` is the JPEG quality, clamped to 1–100.
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            quality: quality.clamp(1, 100),
        }
    }
}

fn is_frame(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    !hidden
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Newest frame in `dir`; ties on modification time go to the later name.
fn newest_frame(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_frame(e.path()))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, e.into_path()))
        })
        .max()
        .map(|(_, path)| path)
}

fn frame_failed(path: &Path, e: impl std::fmt::Display) -> CaptureError {
    CaptureError::FrameFailed(format!("{}: {e}", path.display()))
}

/// Decode, scale down to fit `constraints` if larger, and encode as JPEG.
fn encode_frame(path: &Path, constraints: Constraints, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let img = ImageReader::open(path)
        .map_err(|e| frame_failed(path, e))?
        .with_guessed_format()
        .map_err(|e| frame_failed(path, e))?
        .decode()
        .map_err(|e| frame_failed(path, e))?;

    let img = if img.width() > constraints.width || img.height() > constraints.height {
        img.resize(constraints.width, constraints.height, FilterType::Lanczos3)
    } else {
        img
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| frame_failed(path, e))?;
    Ok(buf)
}

impl Camera for FolderCamera {
    type Stream = FolderStream;

    fn open(&mut self, constraints: Constraints) -> Result<FolderStream, CaptureError> {
        if let Err(e) = std::fs::read_dir(&self.dir) {
            return Err(match e.kind() {
                io::ErrorKind::NotFound => CaptureError::NotFound,
                io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
                _ => CaptureError::Unsupported,
            });
        }
        debug!(dir = %self.dir.display(), ?constraints, "camera stream opened");
        Ok(FolderStream {
            dir: self.dir.clone(),
            constraints,
            frames: 0,
        })
    }

    fn capture_frame(&mut self, stream: &mut FolderStream) -> Result<Vec<u8>, CaptureError> {
        let path = newest_frame(&stream.dir).ok_or_else(|| {
            CaptureError::FrameFailed(format!("no frame available in {}", stream.dir.display()))
        })?;
        let bytes = encode_frame(&path, stream.constraints, self.quality)?;
        stream.frames += 1;
        debug!(frame = %path.display(), size = bytes.len(), "frame captured");
        Ok(bytes)
    }

    fn close(&mut self, stream: FolderStream) {
        debug!(dir = %stream.dir.display(), frames = stream.frames, "camera stream closed");
    }
}
