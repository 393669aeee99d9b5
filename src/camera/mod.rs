//! Camera capability: open a stream, grab still frames, close it.
//!
//! The session never talks to a camera directly. The workflow opens a
//! stream through [`Camera`], turns each grabbed frame into an
//! `ImageCaptured` event, and maps failures to [`CaptureError`], whose
//! messages go straight to the operator.
//!
//! - [`Camera`]: the trait
//! - [`FolderCamera`]: frames from a tethering hot folder, re-encoded as JPEG

pub mod folder;

pub use folder::FolderCamera;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Permission denied. Please allow camera access")]
    PermissionDenied,
    #[error("No camera found. Please ensure a camera is connected and enabled")]
    NotFound,
    #[error("Camera access is not supported here")]
    Unsupported,
    #[error("Could not capture image: {0}")]
    FrameFailed(String),
}

/// Requested stream size. The camera may deliver something else; frames
/// larger than this are scaled down to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub width: u32,
    pub height: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

pub trait Camera {
    type Stream;

    fn open(&mut self, constraints: Constraints) -> Result<Self::Stream, CaptureError>;

    /// Grab one still frame as encoded image bytes.
    fn capture_frame(&mut self, stream: &mut Self::Stream) -> Result<Vec<u8>, CaptureError>;

    fn close(&mut self, stream: Self::Stream);
}
