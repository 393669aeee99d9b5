//! The capture session state machine.
//!
//! A [`Session`] walks the operator through the shot list one shot at a
//! time: capture, review, then either retake or accept. Accepting hands the
//! image to storage; the storage result comes back as another event.
//!
//! ```text
//!            ListLoaded                ImageCaptured             Accept
//!   idle ───────────────▶ ready_to_capture ───────▶ image_captured ──────▶ saving
//!                              ▲    ▲                     │                  │
//!                              │    └──── Retake ─────────┘                  │
//!                              ├──────── SaveFailed ─────────────────────────┤
//!                              └──────── SaveSucceeded (more shots) ─────────┤
//!                                                                            │
//!                                        finished ◀── SaveSucceeded (last) ──┘
//! ```
//!
//! `SetError` moves any state to `error`; `Reset` moves any state back to
//! `idle`. `ImageCaptured` is accepted from any state.
//!
//! The session performs no I/O. Anything that needs a collaborator comes
//! out of [`Session::handle`] as a [`Command`] for the caller to carry out,
//! and the result goes back in as an [`Event`].
//!
//! ## Captured image ownership
//!
//! At most one [`CapturedImage`] exists per session. It owns its
//! [`PreviewHandle`], so every transition that drops the image (new
//! capture, retake, save success or failure, error with `clear_preview`,
//! reset, dropping the session) releases the preview exactly once.
//!
//! A failed save discards the image instead of keeping it for a one-click
//! retry: a partially completed write may have consumed it, so the operator
//! recaptures.

use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::types::{SaveMethod, Shot, ShotList};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    ReadyToCapture,
    ImageCaptured,
    Saving,
    Finished,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::ReadyToCapture => "ready to capture",
            SessionStatus::ImageCaptured => "image captured",
            SessionStatus::Saving => "saving",
            SessionStatus::Finished => "finished",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// The image currently under review, with its preview.
#[derive(Debug)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    preview: PreviewHandle,
}

impl CapturedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum Event {
    ListLoaded(ShotList),
    ImageCaptured(Vec<u8>),
    Accept,
    SaveSucceeded(SaveMethod),
    SaveFailed(String),
    Retake,
    SetError { message: String, clear_preview: bool },
    Reset,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::ListLoaded(_) => "list_loaded",
            Event::ImageCaptured(_) => "image_captured",
            Event::Accept => "accept",
            Event::SaveSucceeded(_) => "save_succeeded",
            Event::SaveFailed(_) => "save_failed",
            Event::Retake => "retake",
            Event::SetError { .. } => "set_error",
            Event::Reset => "reset",
        }
    }
}

/// Work the session asks its caller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Persist `image` under the shot's `filename`, then report back with
    /// `SaveSucceeded` or `SaveFailed`.
    Save { image: Arc<[u8]>, filename: String },
    /// Forget the cached directory grant.
    DiscardCapability,
}

/// Why an event was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `Accept` or `Retake` without an image under review.
    NotReviewing,
    /// `Accept` with no current shot, or one without a filename.
    NoTargetFilename,
    /// A save result arrived while no save was in flight.
    NotSaving,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotReviewing => write!(f, "no captured image under review"),
            Rejection::NoTargetFilename => write!(f, "current shot has no filename"),
            Rejection::NotSaving => write!(f, "no save in progress"),
        }
    }
}

/// Result of feeding one event to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Option<Command>),
    Ignored(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// Point-in-time view of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: SessionStatus,
    /// Index into the shot list; `None` until a list is loaded.
    pub current_index: Option<usize>,
    pub total: usize,
    /// Shots saved so far.
    pub completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_shot: Option<Shot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_method: Option<SaveMethod>,
}

/// Aggregate root of one capture session.
#[derive(Debug)]
pub struct Session {
    shots: ShotList,
    current_index: Option<usize>,
    captured: Option<CapturedImage>,
    status: SessionStatus,
    last_error: Option<String>,
    save_method: Option<SaveMethod>,
    previews: Arc<PreviewRegistry>,
}

impl Session {
    pub fn new(previews: Arc<PreviewRegistry>) -> Self {
        Self {
            shots: ShotList::default(),
            current_index: None,
            captured: None,
            status: SessionStatus::Idle,
            last_error: None,
            save_method: None,
            previews,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn shots(&self) -> &ShotList {
        &self.shots
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// The shot being worked on. `None` before loading and once finished.
    pub fn current_shot(&self) -> Option<&Shot> {
        self.current_index.and_then(|i| self.shots.get(i))
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn save_method(&self) -> Option<SaveMethod> {
        self.save_method
    }

    /// Apply one event. Never fails: events whose precondition doesn't
    /// hold leave the session untouched and come back as
    /// [`Outcome::Ignored`].
    pub fn handle(&mut self, event: Event) -> Outcome {
        let from = self.status;
        let name = event.name();
        let outcome = self.apply(event);
        match &outcome {
            Outcome::Applied(command) => debug!(
                event = name,
                from = %from,
                to = %self.status,
                command = command.is_some(),
                "session transition"
            ),
            Outcome::Ignored(reason) => {
                debug!(event = name, status = %from, %reason, "session event ignored")
            }
        }
        outcome
    }

    fn apply(&mut self, event: Event) -> Outcome {
        match event {
            Event::ListLoaded(shots) => {
                self.captured = None;
                self.current_index = if shots.is_empty() { None } else { Some(0) };
                self.status = if shots.is_empty() {
                    SessionStatus::Idle
                } else {
                    SessionStatus::ReadyToCapture
                };
                self.shots = shots;
                self.last_error = None;
                self.save_method = None;
                Outcome::Applied(None)
            }
            Event::ImageCaptured(bytes) => {
                // Release the old preview before issuing the new one.
                self.captured = None;
                let preview = self.previews.create(&bytes);
                self.captured = Some(CapturedImage {
                    bytes: bytes.into(),
                    preview,
                });
                self.last_error = None;
                self.status = SessionStatus::ImageCaptured;
                Outcome::Applied(None)
            }
            Event::Accept => {
                if self.status != SessionStatus::ImageCaptured {
                    return Outcome::Ignored(Rejection::NotReviewing);
                }
                let Some(captured) = &self.captured else {
                    return Outcome::Ignored(Rejection::NotReviewing);
                };
                let filename = match self.current_shot() {
                    Some(shot) if !shot.filename.is_empty() => shot.filename.clone(),
                    _ => return Outcome::Ignored(Rejection::NoTargetFilename),
                };
                let image = Arc::clone(&captured.bytes);
                self.status = SessionStatus::Saving;
                Outcome::Applied(Some(Command::Save { image, filename }))
            }
            Event::SaveSucceeded(method) => {
                if self.status != SessionStatus::Saving {
                    return Outcome::Ignored(Rejection::NotSaving);
                }
                self.captured = None;
                self.save_method = Some(method);
                let next = self.current_index.map_or(0, |i| i + 1);
                self.current_index = Some(next);
                self.status = if next >= self.shots.len() {
                    SessionStatus::Finished
                } else {
                    SessionStatus::ReadyToCapture
                };
                Outcome::Applied(None)
            }
            Event::SaveFailed(message) => {
                if self.status != SessionStatus::Saving {
                    return Outcome::Ignored(Rejection::NotSaving);
                }
                self.captured = None;
                self.last_error = Some(message);
                self.status = SessionStatus::ReadyToCapture;
                Outcome::Applied(None)
            }
            Event::Retake => {
                if self.status != SessionStatus::ImageCaptured {
                    return Outcome::Ignored(Rejection::NotReviewing);
                }
                self.captured = None;
                self.status = SessionStatus::ReadyToCapture;
                Outcome::Applied(None)
            }
            Event::SetError {
                message,
                clear_preview,
            } => {
                if clear_preview {
                    self.captured = None;
                }
                self.last_error = Some(message);
                self.status = SessionStatus::Error;
                Outcome::Applied(None)
            }
            Event::Reset => {
                self.captured = None;
                self.shots = ShotList::default();
                self.current_index = None;
                self.status = SessionStatus::Idle;
                self.last_error = None;
                self.save_method = None;
                Outcome::Applied(Some(Command::DiscardCapability))
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let total = self.shots.len();
        Snapshot {
            status: self.status,
            current_index: self.current_index,
            total,
            completed: self.current_index.map_or(0, |i| i.min(total)),
            current_shot: self.current_shot().cloned(),
            preview: self.captured.as_ref().map(|c| c.preview.uri()),
            error: self.last_error.clone(),
            save_method: self.save_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::shot_list;

    fn session() -> (Session, Arc<PreviewRegistry>) {
        let registry = PreviewRegistry::new();
        (Session::new(Arc::clone(&registry)), registry)
    }

    fn loaded(n: usize) -> (Session, Arc<PreviewRegistry>) {
        let (mut s, r) = session();
        s.handle(Event::ListLoaded(shot_list(n)));
        (s, r)
    }

    fn save_command(outcome: Outcome) -> (Arc<[u8]>, String) {
        match outcome {
            Outcome::Applied(Some(Command::Save { image, filename })) => (image, filename),
            other => panic!("expected save command, got {other:?}"),
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn starts_idle_and_unloaded() {
        let (s, _) = session();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.current_index(), None);
        assert!(s.captured().is_none());
        assert!(s.current_shot().is_none());
    }

    #[test]
    fn loading_list_readies_first_shot() {
        let (s, _) = loaded(3);
        assert_eq!(s.status(), SessionStatus::ReadyToCapture);
        assert_eq!(s.current_index(), Some(0));
        assert_eq!(s.current_shot().unwrap().filename, "shot-0.jpg");
    }

    #[test]
    fn loading_empty_list_stays_idle() {
        let (mut s, _) = session();
        s.handle(Event::ListLoaded(ShotList::default()));
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.current_index(), None);
    }

    #[test]
    fn loading_releases_held_capture() {
        let (mut s, registry) = loaded(2);
        s.handle(Event::ImageCaptured(b"a".to_vec()));
        s.handle(Event::ListLoaded(shot_list(1)));
        assert!(s.captured().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    // =========================================================================
    // Capture and review
    // =========================================================================

    #[test]
    fn capture_moves_to_review_and_clears_error() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::SetError {
            message: "camera hiccup".into(),
            clear_preview: false,
        });
        s.handle(Event::ImageCaptured(b"jpeg".to_vec()));
        assert_eq!(s.status(), SessionStatus::ImageCaptured);
        assert_eq!(s.captured().unwrap().bytes(), b"jpeg");
        assert!(s.last_error().is_none());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn recapture_replaces_and_releases_previous() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::ImageCaptured(b"first".to_vec()));
        let first_id = s.captured().unwrap().preview().id();
        s.handle(Event::ImageCaptured(b"second".to_vec()));
        assert!(!registry.is_live(first_id));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(s.captured().unwrap().bytes(), b"second");
    }

    #[test]
    fn retake_discards_capture() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        assert!(s.handle(Event::Retake).is_applied());
        assert_eq!(s.status(), SessionStatus::ReadyToCapture);
        assert!(s.captured().is_none());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(s.current_index(), Some(0));
    }

    #[test]
    fn retake_without_capture_ignored() {
        let (mut s, _) = loaded(1);
        assert_eq!(
            s.handle(Event::Retake),
            Outcome::Ignored(Rejection::NotReviewing)
        );
    }

    // =========================================================================
    // Accept and save results
    // =========================================================================

    #[test]
    fn accept_emits_save_for_current_filename() {
        let (mut s, _) = loaded(2);
        s.handle(Event::ImageCaptured(b"pixels".to_vec()));
        let (image, filename) = save_command(s.handle(Event::Accept));
        assert_eq!(&*image, b"pixels");
        assert_eq!(filename, "shot-0.jpg");
        assert_eq!(s.status(), SessionStatus::Saving);
        assert!(s.captured().is_some());
    }

    #[test]
    fn accept_without_capture_is_noop() {
        let (mut s, _) = loaded(2);
        let before = s.snapshot();
        assert_eq!(
            s.handle(Event::Accept),
            Outcome::Ignored(Rejection::NotReviewing)
        );
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn second_accept_while_saving_ignored() {
        let (mut s, _) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::Accept);
        assert_eq!(
            s.handle(Event::Accept),
            Outcome::Ignored(Rejection::NotReviewing)
        );
        assert_eq!(s.status(), SessionStatus::Saving);
    }

    #[test]
    fn accept_with_no_shot_ignored() {
        let (mut s, registry) = session();
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        assert_eq!(
            s.handle(Event::Accept),
            Outcome::Ignored(Rejection::NoTargetFilename)
        );
        assert_eq!(s.status(), SessionStatus::ImageCaptured);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn save_success_advances() {
        let (mut s, registry) = loaded(2);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::Accept);
        s.handle(Event::SaveSucceeded(SaveMethod::Capability));
        assert_eq!(s.status(), SessionStatus::ReadyToCapture);
        assert_eq!(s.current_index(), Some(1));
        assert_eq!(s.save_method(), Some(SaveMethod::Capability));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn last_save_finishes_past_the_end() {
        let (mut s, _) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::Accept);
        s.handle(Event::SaveSucceeded(SaveMethod::Fallback));
        assert_eq!(s.status(), SessionStatus::Finished);
        assert_eq!(s.current_index(), Some(1));
        assert!(s.current_shot().is_none());
        let snap = s.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.total, 1);
    }

    #[test]
    fn save_failure_discards_image_and_keeps_position() {
        let (mut s, registry) = loaded(2);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::Accept);
        s.handle(Event::SaveFailed("disk full".into()));
        assert_eq!(s.status(), SessionStatus::ReadyToCapture);
        assert_eq!(s.last_error(), Some("disk full"));
        assert_eq!(s.current_index(), Some(0));
        assert!(s.captured().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn recapture_after_failed_save_never_sees_old_buffer() {
        let (mut s, _) = loaded(1);
        s.handle(Event::ImageCaptured(b"old".to_vec()));
        s.handle(Event::Accept);
        s.handle(Event::SaveFailed("nope".into()));
        s.handle(Event::ImageCaptured(b"new".to_vec()));
        let (image, _) = save_command(s.handle(Event::Accept));
        assert_eq!(&*image, b"new");
    }

    #[test]
    fn save_results_outside_saving_ignored() {
        let (mut s, _) = loaded(2);
        assert_eq!(
            s.handle(Event::SaveSucceeded(SaveMethod::Capability)),
            Outcome::Ignored(Rejection::NotSaving)
        );
        assert_eq!(
            s.handle(Event::SaveFailed("x".into())),
            Outcome::Ignored(Rejection::NotSaving)
        );
        assert_eq!(s.current_index(), Some(0));
    }

    // =========================================================================
    // Errors and reset
    // =========================================================================

    #[test]
    fn set_error_can_keep_preview() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::SetError {
            message: "boom".into(),
            clear_preview: false,
        });
        assert_eq!(s.status(), SessionStatus::Error);
        assert!(s.captured().is_some());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn set_error_can_clear_preview() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::SetError {
            message: "boom".into(),
            clear_preview: true,
        });
        assert!(s.captured().is_none());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(s.last_error(), Some("boom"));
    }

    #[test]
    fn reset_restores_initial_and_discards_capability() {
        let (mut s, registry) = loaded(2);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        s.handle(Event::SetError {
            message: "boom".into(),
            clear_preview: false,
        });
        assert_eq!(
            s.handle(Event::Reset),
            Outcome::Applied(Some(Command::DiscardCapability))
        );
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.current_index(), None);
        assert!(s.shots().is_empty());
        assert!(s.last_error().is_none());
        assert!(s.save_method().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn dropping_session_releases_preview() {
        let (mut s, registry) = loaded(1);
        s.handle(Event::ImageCaptured(b"x".to_vec()));
        drop(s);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 1);
    }

    // =========================================================================
    // Full walk and invariants
    // =========================================================================

    #[test]
    fn two_shot_walkthrough() {
        let (mut s, _) = session();
        let mut statuses = vec![s.status()];
        let events = [
            Event::ListLoaded(shot_list(2)),
            Event::ImageCaptured(b"one".to_vec()),
            Event::Accept,
            Event::SaveSucceeded(SaveMethod::Capability),
            Event::ImageCaptured(b"two".to_vec()),
            Event::Accept,
            Event::SaveSucceeded(SaveMethod::Capability),
        ];
        for event in events {
            assert!(s.handle(event).is_applied());
            statuses.push(s.status());
        }
        use SessionStatus::*;
        assert_eq!(
            statuses,
            [
                Idle,
                ReadyToCapture,
                ImageCaptured,
                Saving,
                ReadyToCapture,
                ImageCaptured,
                Saving,
                Finished
            ]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::test_helpers::shot_list;
    use proptest::prelude::*;

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            1 => (1usize..5).prop_map(|n| Event::ListLoaded(shot_list(n))),
            3 => any::<u8>().prop_map(|b| Event::ImageCaptured(vec![b])),
            3 => Just(Event::Accept),
            2 => prop_oneof![Just(SaveMethod::Capability), Just(SaveMethod::Fallback)]
                .prop_map(Event::SaveSucceeded),
            1 => Just(Event::SaveFailed("disk full".into())),
            1 => Just(Event::Retake),
            1 => any::<bool>().prop_map(|clear_preview| Event::SetError {
                message: "camera unplugged".into(),
                clear_preview,
            }),
            1 => Just(Event::Reset),
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_live_preview(events in prop::collection::vec(arb_event(), 0..60)) {
            let registry = PreviewRegistry::new();
            let mut session = Session::new(Arc::clone(&registry));
            for event in events {
                session.handle(event);
                prop_assert!(registry.live_count() <= 1);
                prop_assert_eq!(registry.live_count(), usize::from(session.captured().is_some()));
            }
            drop(session);
            prop_assert_eq!(registry.live_count(), 0);
        }

        #[test]
        fn no_capture_held_while_waiting(events in prop::collection::vec(arb_event(), 0..60)) {
            let mut session = Session::new(PreviewRegistry::new());
            for event in events {
                session.handle(event);
                if matches!(
                    session.status(),
                    SessionStatus::ReadyToCapture | SessionStatus::Idle | SessionStatus::Finished
                ) {
                    prop_assert!(session.captured().is_none());
                }
            }
        }

        #[test]
        fn index_only_moves_forward(events in prop::collection::vec(arb_event(), 0..60)) {
            let mut session = Session::new(PreviewRegistry::new());
            let mut last_index = session.current_index();
            for event in events {
                let reloads = matches!(event, Event::ListLoaded(_) | Event::Reset);
                session.handle(event);
                if !reloads {
                    prop_assert!(session.current_index() >= last_index);
                }
                if let Some(i) = session.current_index() {
                    prop_assert!(i <= session.shots().len());
                }
                last_index = session.current_index();
            }
        }
    }
}
