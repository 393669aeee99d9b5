//! Drives a [`Session`] with real collaborators.
//!
//! The session decides; the workflow does. Each operator action becomes an
//! event, any [`Command`] the session emits is carried out here, and its
//! result is fed straight back in before the action returns. Nothing is
//! ever in flight between two actions, so a save result for shot N is fully
//! applied before shot N+1 can be captured.
//!
//! The camera stream is opened lazily on the first capture and closed when
//! the session finishes, on reset, and when the workflow is dropped.

use crate::camera::{Camera, Constraints};
use crate::ingest::{IngestError, SkippedRow, ingest_report};
use crate::session::{Command, Event, Outcome, Session, SessionStatus, Snapshot};
use crate::storage::{DirectoryStore, Downloader, Persistence};
use crate::tabular::TabularDecoder;
use crate::types::ShotList;
use tracing::{debug, warn};

pub struct Workflow<C: Camera, S: DirectoryStore, D: Downloader> {
    session: Session,
    camera: C,
    constraints: Constraints,
    stream: Option<C::Stream>,
    persistence: Persistence<S, D>,
}

impl<C: Camera, S: DirectoryStore, D: Downloader> Workflow<C, S, D> {
    pub fn new(
        session: Session,
        camera: C,
        constraints: Constraints,
        persistence: Persistence<S, D>,
    ) -> Self {
        Self {
            session,
            camera,
            constraints,
            stream: None,
            persistence,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn persistence(&self) -> &Persistence<S, D> {
        &self.persistence
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    /// Decode and load a shot list.
    ///
    /// On failure any previous list is dropped and the error is surfaced
    /// through the session as well as returned.
    pub fn load_shot_list(
        &mut self,
        decoder: &impl TabularDecoder,
        bytes: &[u8],
    ) -> Result<Vec<SkippedRow>, IngestError> {
        match ingest_report(decoder, bytes) {
            Ok(report) => {
                self.dispatch(Event::ListLoaded(report.shots));
                Ok(report.skipped)
            }
            Err(e) => {
                self.dispatch(Event::ListLoaded(ShotList::default()));
                self.dispatch(Event::SetError {
                    message: format!("Failed to parse file: {e}"),
                    clear_preview: true,
                });
                Err(e)
            }
        }
    }

    /// Grab a frame for the current shot.
    ///
    /// Only meaningful while a shot is waiting: ready to capture, under
    /// review (capturing again replaces the image), or after an error.
    pub fn capture(&mut self) -> Snapshot {
        let waiting = matches!(
            self.session.status(),
            SessionStatus::ReadyToCapture | SessionStatus::ImageCaptured | SessionStatus::Error
        );
        if !waiting || self.session.current_shot().is_none() {
            debug!(status = %self.session.status(), "capture ignored, no shot waiting");
            return self.snapshot();
        }

        if self.stream.is_none() {
            match self.camera.open(self.constraints) {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => {
                    warn!(error = %e, "camera unavailable");
                    self.dispatch(Event::SetError {
                        message: e.to_string(),
                        clear_preview: false,
                    });
                    return self.snapshot();
                }
            }
        }

        let frame = match self.stream.as_mut() {
            Some(stream) => self.camera.capture_frame(stream),
            None => return self.snapshot(),
        };
        match frame {
            Ok(bytes) => self.dispatch(Event::ImageCaptured(bytes)),
            Err(e) => {
                warn!(error = %e, "frame capture failed");
                self.dispatch(Event::SetError {
                    message: e.to_string(),
                    clear_preview: false,
                });
            }
        }
        self.snapshot()
    }

    pub fn accept(&mut self) -> Snapshot {
        self.dispatch(Event::Accept);
        if self.session.status() == SessionStatus::Finished {
            self.close_camera();
        }
        self.snapshot()
    }

    pub fn retake(&mut self) -> Snapshot {
        self.dispatch(Event::Retake);
        self.snapshot()
    }

    /// Start over: drop the list, the capture, the directory grant, and
    /// the camera stream.
    pub fn reset(&mut self) -> Snapshot {
        self.dispatch(Event::Reset);
        self.close_camera();
        self.snapshot()
    }

    /// Feed an event to the session and carry out whatever it asks for,
    /// feeding results back until the session is quiet.
    fn dispatch(&mut self, event: Event) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = match self.session.handle(event) {
                Outcome::Applied(Some(Command::Save { image, filename })) => {
                    match self.persistence.save(&image, &filename) {
                        Ok(saved) => Some(Event::SaveSucceeded(saved.method)),
                        Err(e) => Some(Event::SaveFailed(e.to_string())),
                    }
                }
                Outcome::Applied(Some(Command::DiscardCapability)) => {
                    self.persistence.discard_capability();
                    None
                }
                Outcome::Applied(None) | Outcome::Ignored(_) => None,
            };
        }
    }

    fn close_camera(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.camera.close(stream);
        }
    }
}

impl<C: Camera, S: DirectoryStore, D: Downloader> Drop for Workflow<C, S, D> {
    fn drop(&mut self) {
        self.close_camera();
    }
}
