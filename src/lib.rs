//! # Shot Capture
//!
//! A guided capture workflow for product photography. Load a shot list
//! (one row per photo to take), then walk it one shot at a time: capture,
//! review, retake or accept. Accepted images are saved under the filename
//! the shot list names, into a directory the operator picks once per
//! session, with a downloads folder as fallback.
//!
//! # Architecture: Decide, Then Do
//!
//! ```text
//!  shot list bytes ──▶ tabular ──▶ ingest ──▶ ShotList
//!                                               │ ListLoaded
//!                                               ▼
//!   camera ── ImageCaptured ──▶  session  ──▶ Command::Save ──▶ storage
//!                                  ▲                               │
//!                                  └──── SaveSucceeded / Failed ◀──┘
//! ```
//!
//! The [`session`] is a pure state machine: it takes events and returns
//! commands, and never touches a camera or a disk. The [`workflow`] owns the
//! collaborators, carries out commands, and feeds results back as events.
//! Every collaborator sits behind a trait, so the whole workflow runs in
//! tests against in-memory mocks.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tabular`] | Bytes → grid of cells. `TabularDecoder` trait, CSV and workbook implementations |
//! | [`ingest`] | Grid → validated `ShotList`, with a report of skipped rows |
//! | [`session`] | The capture state machine and its `Snapshot` view |
//! | [`preview`] | Preview handles released exactly once, on drop |
//! | [`camera`] | `Camera` trait, operator-facing capture errors, hot-folder camera |
//! | [`storage`] | Directory-grant and downloads storage, and the save strategy over them |
//! | [`workflow`] | Wires session, camera and storage together |
//! | [`naming`] | Filename sanitizing for anything that reaches the filesystem |
//! | [`config`] | Layered TOML configuration |
//! | [`types`] | Shared data model (`Shot`, `ShotList`, `SaveMethod`) |
//! | [`output`] | Terminal formatting of shot lists and progress |
//!
//! # Design Decisions
//!
//! ## One Capture At A Time
//!
//! The session holds at most one captured image, and its preview is owned
//! by it. Replacing, retaking, saving, erroring with `clear_preview` or
//! resetting drops the image, and dropping releases the preview. There is
//! no separate cleanup step to forget.
//!
//! ## Sanitize At The Boundary
//!
//! Shot list filenames are kept verbatim in the model and sanitized only
//! when a save happens. What the operator sees matches their sheet; what
//! lands on disk is always a plain name with no path separators.
//!
//! ## The Directory Grant Is Cached, Permission Is Not
//!
//! The operator picks a directory once. Permission is re-checked on every
//! save, since it can be revoked at any time, and any directory failure
//! drops the grant so the next save asks again.

pub mod camera;
pub mod config;
pub mod ingest;
pub mod naming;
pub mod output;
pub mod preview;
pub mod session;
pub mod storage;
pub mod tabular;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
