//! Local filesystem implementations of the storage traits.
//!
//! - [`LocalDirectoryStore`]: the "granted directory" is a path chosen by a
//!   picker callback (a terminal prompt in the CLI, or a fixed path from
//!   config). Writes go through a temp file in the same directory and are
//!   renamed into place, so a failed write never leaves a truncated image
//!   under the target name.
//! - [`DownloadsFolder`]: browser-style downloads. Never overwrites; a
//!   clash becomes `name (1).jpg`, `name (2).jpg`, …

use super::backend::{
    DirectoryStore, DownloadError, Downloader, Permission, PromptError, StoreError,
};
use crate::naming::MAX_FILENAME_LEN;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Highest `(n)` suffix tried before giving up on a download name.
const MAX_NAME_SUFFIX: u32 = 999;

/// Picker answer: a directory, or `None` if the operator cancelled.
pub type DirectoryPicker = Box<dyn FnMut() -> Option<PathBuf>>;

pub struct LocalDirectoryStore {
    picker: DirectoryPicker,
}

impl LocalDirectoryStore {
    pub fn new(picker: DirectoryPicker) -> Self {
        Self { picker }
    }

    /// Store whose "prompt" always answers with `dir`.
    pub fn fixed(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(Box::new(move || Some(dir.clone())))
    }
}

fn writable_dir(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_dir() && !m.permissions().readonly())
}

/// A single path component: no separators, not `.` or `..`, within the
/// filesystem name limit.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= MAX_FILENAME_LEN
        && !name.contains(['/', '\\', '\0'])
}

impl DirectoryStore for LocalDirectoryStore {
    type Handle = PathBuf;

    fn prompt_directory(&mut self) -> Result<PathBuf, PromptError> {
        let dir = (self.picker)().ok_or(PromptError::Cancelled)?;
        if dir.exists() && !dir.is_dir() {
            return Err(PromptError::Failed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        debug!(dir = %dir.display(), "directory granted");
        Ok(dir)
    }

    fn check_permission(&self, handle: &PathBuf) -> Permission {
        if writable_dir(handle) {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    /// Creates the directory if it has gone missing, then checks again.
    fn request_permission(&mut self, handle: &PathBuf) -> Permission {
        if !handle.exists()
            && let Err(e) = std::fs::create_dir_all(handle)
        {
            debug!(dir = %handle.display(), error = %e, "could not create directory");
        }
        self.check_permission(handle)
    }

    fn write_file(&mut self, handle: &PathBuf, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if !is_plain_name(name) {
            return Err(StoreError::Rejected(format!("{name:?} is not a plain file name")));
        }
        let mut staged = NamedTempFile::new_in(handle)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(handle.join(name)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Downloads-style fallback into a fixed folder.
pub struct DownloadsFolder {
    dir: PathBuf,
}

impl DownloadsFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `name`, then `stem (1).ext`, `stem (2).ext`, … The stem is shortened
/// so the result still fits in [`MAX_FILENAME_LEN`] bytes.
fn candidate_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    let suffix = format!(" ({n})");
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + suffix.len() < MAX_FILENAME_LEN => {
            (stem, &name[stem.len()..])
        }
        _ => (name, ""),
    };
    let mut end = stem.len().min(MAX_FILENAME_LEN - suffix.len() - ext.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{suffix}{ext}", &stem[..end])
}

impl Downloader for DownloadsFolder {
    fn trigger_download(&mut self, bytes: &[u8], name: &str) -> Result<String, DownloadError> {
        if !is_plain_name(name) {
            return Err(DownloadError::Rejected(format!("{name:?} is not a plain file name")));
        }
        std::fs::create_dir_all(&self.dir)?;

        // The staged temp file is the short-lived reference to the bytes;
        // it is removed on drop if no name could be claimed.
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;

        for n in 0..=MAX_NAME_SUFFIX {
            let candidate = candidate_name(name, n);
            match staged.persist_noclobber(self.dir.join(&candidate)) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    staged = e.file;
                }
                Err(e) => return Err(e.error.into()),
            }
        }
        Err(DownloadError::NameExhausted(name.to_string()))
    }
}
