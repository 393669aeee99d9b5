//! The save strategy: granted directory first, downloads fallback second.
//!
//! ```text
//! save(bytes, name)
//!   name ← sanitize(name)
//!   directory store available?
//!     ├─ no grant cached → prompt operator ── cancelled → Err(Cancelled)
//!     ├─ check permission ── denied → request ── denied → drop grant ─┐
//!     ├─ write file ── ok → Ok(Capability)                           │
//!     └─ any other failure → drop grant ─────────────────────────────┤
//!   downloads fallback ◀─────────────────────────────────────────────┘
//!     ├─ ok → Ok(Fallback)
//!     └─ err → Err(FallbackFailed)
//! ```
//!
//! The grant is cached for the life of the [`Persistence`] value, so the
//! operator picks a directory once per session. Permission is re-checked on
//! every save because it can be revoked behind our back. Any failure on
//! the directory path other than cancellation drops the grant, so the next
//! save prompts again. Cancellation can only happen at the prompt, i.e.
//! when no grant is cached, so it never costs an earlier grant.

use super::backend::{DirectoryStore, Downloader, Permission, PromptError, StoreError};
use crate::naming::sanitize_filename;
use crate::types::SaveMethod;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Permission denied to write to the selected directory")]
    PermissionDenied,
    #[error("Save cancelled.")]
    Cancelled,
    #[error("Failed to save file: {0}")]
    WriteFailed(String),
    #[error("Failed to initiate download: {0}")]
    FallbackFailed(String),
}

/// A completed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub method: SaveMethod,
    /// Name the file was stored under.
    pub file_name: String,
}

/// Why the directory path gave up.
#[derive(Debug)]
enum DirectoryFailure {
    Cancelled,
    PermissionDenied,
    Prompt(String),
    Write(StoreError),
}

impl DirectoryFailure {
    fn into_save_error(self) -> SaveError {
        match self {
            DirectoryFailure::Cancelled => SaveError::Cancelled,
            DirectoryFailure::PermissionDenied => SaveError::PermissionDenied,
            DirectoryFailure::Prompt(msg) => SaveError::WriteFailed(msg),
            DirectoryFailure::Write(e) => SaveError::WriteFailed(e.to_string()),
        }
    }
}

/// Owns the storage collaborators and the cached directory grant.
pub struct Persistence<S: DirectoryStore, D: Downloader> {
    store: Option<S>,
    fallback: Option<D>,
    capability: Option<S::Handle>,
}

impl<S: DirectoryStore, D: Downloader> Persistence<S, D> {
    /// `store` is `None` where directory grants aren't supported; `fallback`
    /// is `None` when downloads are disabled by configuration.
    pub fn new(store: Option<S>, fallback: Option<D>) -> Self {
        Self {
            store,
            fallback,
            capability: None,
        }
    }

    /// Whether a directory grant is currently cached.
    pub fn has_capability(&self) -> bool {
        self.capability.is_some()
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub fn fallback(&self) -> Option<&D> {
        self.fallback.as_ref()
    }

    /// Forget the cached grant; the next save prompts again.
    pub fn discard_capability(&mut self) {
        if self.capability.take().is_some() {
            info!("directory grant discarded");
        }
    }

    /// Save `bytes` under the sanitized `suggested_name`.
    pub fn save(&mut self, bytes: &[u8], suggested_name: &str) -> Result<Saved, SaveError> {
        let file_name = sanitize_filename(suggested_name);

        let directory_failure = match self.store.as_mut().filter(|s| s.is_available()) {
            Some(store) => match save_to_directory(store, &mut self.capability, bytes, &file_name)
            {
                Ok(()) => {
                    debug!(file = %file_name, "saved to granted directory");
                    return Ok(Saved {
                        method: SaveMethod::Capability,
                        file_name,
                    });
                }
                Err(DirectoryFailure::Cancelled) => {
                    info!("directory selection cancelled");
                    return Err(SaveError::Cancelled);
                }
                Err(failure) => {
                    self.capability = None;
                    warn!(file = %file_name, ?failure, "directory save failed, grant discarded");
                    Some(failure)
                }
            },
            None => None,
        };

        let Some(fallback) = self.fallback.as_mut() else {
            return Err(match directory_failure {
                Some(failure) => failure.into_save_error(),
                None => SaveError::FallbackFailed("downloads are disabled".into()),
            });
        };

        match fallback.trigger_download(bytes, &file_name) {
            Ok(stored_as) => {
                info!(file = %stored_as, "saved via downloads fallback");
                Ok(Saved {
                    method: SaveMethod::Fallback,
                    file_name: stored_as,
                })
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "downloads fallback failed");
                Err(SaveError::FallbackFailed(e.to_string()))
            }
        }
    }
}

fn save_to_directory<S: DirectoryStore>(
    store: &mut S,
    capability: &mut Option<S::Handle>,
    bytes: &[u8],
    file_name: &str,
) -> Result<(), DirectoryFailure> {
    let handle = match capability.clone() {
        Some(handle) => handle,
        None => {
            info!("requesting directory access");
            let handle = store.prompt_directory().map_err(|e| match e {
                PromptError::Cancelled => DirectoryFailure::Cancelled,
                PromptError::Failed(msg) => DirectoryFailure::Prompt(msg),
            })?;
            *capability = Some(handle.clone());
            handle
        }
    };

    if store.check_permission(&handle) != Permission::Granted
        && store.request_permission(&handle) != Permission::Granted
    {
        *capability = None;
        return Err(DirectoryFailure::PermissionDenied);
    }

    store
        .write_file(&handle, file_name, bytes)
        .map_err(DirectoryFailure::Write)
}
