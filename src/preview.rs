//! Ephemeral preview handles for captured images.
//!
//! A captured image is shown to the operator for review before it is saved.
//! The [`PreviewHandle`] is the short-lived reference a viewer uses to
//! render it. Handles are created by a [`PreviewRegistry`] and released when
//! dropped, so whoever drops the owning image also revokes its preview.
//! There is no explicit `release` call to forget or to make twice.
//!
//! With a spool directory configured, each handle is also backed by a file
//! (`preview-<id>.jpg`) that external viewers can open; the file is deleted
//! on release.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Issues preview handles and tracks which ones are live.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    live: Mutex<BTreeSet<u64>>,
    released: AtomicU64,
    spool: Option<PathBuf>,
}

impl PreviewRegistry {
    /// Registry with in-memory handles only.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registry that mirrors each preview into `dir`.
    pub fn spooled(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            spool: Some(dir.into()),
            ..Self::default()
        })
    }

    /// Create a handle for `bytes`.
    ///
    /// A spool write failure is logged and leaves the handle without a
    /// backing file; review can still proceed.
    pub fn create(self: &Arc<Self>, bytes: &[u8]) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.spool.as_ref().and_then(|dir| {
            let path = dir.join(format!("preview-{id}.jpg"));
            match std::fs::write(&path, bytes) {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "could not spool preview");
                    None
                }
            }
        });
        self.lock_live().insert(id);
        debug!(id, "preview created");
        PreviewHandle {
            id,
            path,
            registry: Arc::clone(self),
        }
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.lock_live().len()
    }

    /// Total handles released so far.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Whether the handle with `id` is still live.
    pub fn is_live(&self, id: u64) -> bool {
        self.lock_live().contains(&id)
    }

    fn lock_live(&self) -> std::sync::MutexGuard<'_, BTreeSet<u64>> {
        // A panic while holding the lock can't leave the set half-updated.
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, id: u64, path: Option<&Path>) {
        let removed = self.lock_live().remove(&id);
        debug_assert!(removed, "preview {id} released twice");
        self.released.fetch_add(1, Ordering::Relaxed);
        if let Some(path) = path
            && let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(error = %e, path = %path.display(), "could not remove spooled preview");
        }
        debug!(id, "preview released");
    }
}

/// A live preview reference. Released on drop.
pub struct PreviewHandle {
    id: u64,
    path: Option<PathBuf>,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Viewer-facing reference: the spooled file path if there is one,
    /// otherwise a `preview:<id>` token.
    pub fn uri(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("preview:{}", self.id),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id, self.path.as_deref());
    }
}
