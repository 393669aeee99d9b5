//! Saving accepted captures.
//!
//! The module is split into:
//! - **Backend**: [`DirectoryStore`] and [`Downloader`] traits + error types
//! - **Local**: filesystem implementations used by the CLI
//! - **Strategy**: [`Persistence`], which picks a path, owns the cached
//!   directory grant, and falls back when the grant fails

pub mod backend;
pub mod local;
pub mod strategy;

pub use backend::{
    DirectoryStore, DownloadError, Downloader, Permission, PromptError, StoreError,
};
pub use local::{DirectoryPicker, DownloadsFolder, LocalDirectoryStore};
pub use strategy::{Persistence, SaveError, Saved};
