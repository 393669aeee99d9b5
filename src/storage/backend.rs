//! Storage collaborator traits and their error types.
//!
//! Two ways to land a file:
//!
//! - [`DirectoryStore`]: a directory the operator grants once per session.
//!   The grant is a capability handle that can later lose its permission.
//! - [`Downloader`]: hand the bytes off under a name and let the
//!   environment decide where they go. Always available.
//!
//! [`Persistence`](super::Persistence) decides which one to use.

use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    /// The operator dismissed the directory picker.
    #[error("directory selection cancelled")]
    Cancelled,
    #[error("directory selection failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The store refused the name before touching the disk.
    #[error("write rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no free name for {0}")]
    NameExhausted(String),
    #[error("download rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Operator-granted directory storage.
pub trait DirectoryStore {
    /// The granted directory capability.
    type Handle: Clone + Debug;

    /// Whether this environment supports directory grants at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the operator to pick a writable directory.
    fn prompt_directory(&mut self) -> Result<Self::Handle, PromptError>;

    fn check_permission(&self, handle: &Self::Handle) -> Permission;

    /// Ask again after permission was found missing.
    fn request_permission(&mut self, handle: &Self::Handle) -> Permission;

    /// Create or overwrite `name` under the directory with `bytes`.
    ///
    /// All or nothing: on error no partial file is left under `name`.
    fn write_file(&mut self, handle: &Self::Handle, name: &str, bytes: &[u8])
    -> Result<(), StoreError>;
}

/// Fallback storage that cannot be refused a grant.
pub trait Downloader {
    /// Deliver `bytes` under `name`. Returns the name actually used, which
    /// may differ if `name` was taken.
    fn trigger_download(&mut self, bytes: &[u8], name: &str) -> Result<String, DownloadError>;
}
