//! Drives consecutive sessions for one training mode.
//!
//! The trainer owns the collaborators a session needs (target source,
//! reverse geocoder, clock) and hands every completed session's result to a
//! [`ResultSink`] exactly once. Abandoning or dropping the trainer mid-session
//! records nothing.

use thiserror::Error;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::fetch::{fetch_valid, ConnectionError, TargetFetcher};
use crate::geocode::{PlaceLabel, ReverseGeocoder};
use crate::mode::TrainingMode;
use crate::outcome::{Choice, SessionResult};
use crate::session::{Action, Phase, Session, SessionError};
use crate::stats::ResultSink;
use crate::store::StoreError;
use crate::target::Target;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("result could not be recorded: {0}")]
    Storage(#[from] StoreError),
}

/// Where the trainer currently is. `Failed` is the retryable error display,
/// outside the phase machine.
#[derive(Debug)]
pub enum TrainerState {
    Idle,
    Failed(ConnectionError),
    Active(Session),
}

pub struct Trainer<F: TargetFetcher, G: ReverseGeocoder, C: Clock = SystemClock> {
    mode: TrainingMode,
    fetcher: F,
    geocoder: G,
    clock: C,
    state: TrainerState,
    completed: usize,
    /// Result whose sink write failed, kept for another attempt
    pending: Option<SessionResult>,
}

impl<F: TargetFetcher, G: ReverseGeocoder> Trainer<F, G> {
    pub fn new(mode: TrainingMode, fetcher: F, geocoder: G) -> Self {
        Self::with_clock(mode, fetcher, geocoder, SystemClock)
    }
}

impl<F: TargetFetcher, G: ReverseGeocoder, C: Clock> Trainer<F, G, C> {
    pub fn with_clock(mode: TrainingMode, fetcher: F, geocoder: G, clock: C) -> Self {
        Self {
            mode,
            fetcher,
            geocoder,
            clock,
            state: TrainerState::Idle,
            completed: 0,
            pending: None,
        }
    }

    pub fn mode(&self) -> TrainingMode {
        self.mode
    }

    pub fn state(&self) -> &TrainerState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            TrainerState::Active(session) => Some(session),
            TrainerState::Idle | TrainerState::Failed(_) => None,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        self.session().map(Session::target)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session().map(Session::phase)
    }

    /// Sessions whose result reached the sink under this trainer
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// The current session's result if recording it failed
    pub fn pending_result(&self) -> Option<&SessionResult> {
        self.pending.as_ref()
    }

    /// Try again to record a result whose write failed. `Ok(None)` when
    /// nothing is waiting.
    pub fn record_pending<S: ResultSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<Option<SessionResult>, TrainerError> {
        match self.pending.take() {
            Some(result) => self.emit(result, sink).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a fresh target and enter `Impression`, discarding any current session
    pub fn start(&mut self) -> &TrainerState {
        self.discard_pending();
        self.state = match fetch_valid(&mut self.fetcher, self.mode) {
            Ok(target) => {
                info!(mode = %self.mode, session = target.session_id(), "session started");
                TrainerState::Active(Session::new(target))
            }
            Err(err) => {
                warn!(mode = %self.mode, error = %err, "target fetch failed");
                TrainerState::Failed(err)
            }
        };
        &self.state
    }

    /// Re-attempt a failed fetch
    pub fn retry(&mut self) -> Result<&TrainerState, SessionError> {
        match &self.state {
            TrainerState::Failed(_) => {}
            TrainerState::Active(session) => {
                return Err(SessionError::InvalidAction {
                    action: Action::Retry,
                    phase: session.phase(),
                })
            }
            TrainerState::Idle => {
                return Err(SessionError::NoActiveSession {
                    action: Action::Retry,
                })
            }
        }
        Ok(self.start())
    }

    /// Leave a finished session and start the next one
    pub fn next_session(&mut self) -> Result<&TrainerState, SessionError> {
        let session = self.active(Action::NextSession)?;
        if !session.phase().is_terminal() {
            return Err(SessionError::InvalidAction {
                action: Action::NextSession,
                phase: session.phase(),
            });
        }
        Ok(self.start())
    }

    /// Drop the current session without recording anything
    pub fn abandon(&mut self) {
        if let TrainerState::Active(session) = &self.state {
            if !session.phase().is_terminal() {
                info!(session = session.target().session_id(), phase = %session.phase(), "session abandoned");
            }
        }
        self.discard_pending();
        self.state = TrainerState::Idle;
    }

    pub fn set_impressions(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.active_mut(Action::EditImpressions)?.set_impressions(text)
    }

    /// Advance one phase. Entering `Reveal` resolves the target's place name;
    /// a failed lookup degrades to a placeholder label.
    pub fn proceed(&mut self) -> Result<Phase, SessionError> {
        let session = match &mut self.state {
            TrainerState::Active(session) => session,
            TrainerState::Idle | TrainerState::Failed(_) => {
                return Err(SessionError::NoActiveSession {
                    action: Action::Proceed,
                })
            }
        };
        let phase = session.proceed()?;
        if phase == Phase::Reveal {
            if let Target::Location(t) = session.target() {
                let label = PlaceLabel::resolve(&mut self.geocoder, t.coords);
                session.set_place(label);
            }
        }
        Ok(phase)
    }

    pub fn mark_media_loaded(&mut self, index: usize) -> Result<(), SessionError> {
        self.active_mut(Action::MarkLoaded)?.mark_media_loaded(index)
    }

    pub fn select<S: ResultSink + ?Sized>(
        &mut self,
        choice: Choice,
        sink: &mut S,
    ) -> Result<SessionResult, TrainerError> {
        let now = self.clock.now_ms();
        let result = self
            .active_mut(Action::Select)?
            .select(choice, now)?
            .clone();
        self.emit(result, sink)
    }

    pub fn rate<S: ResultSink + ?Sized>(
        &mut self,
        value: u8,
        sink: &mut S,
    ) -> Result<SessionResult, TrainerError> {
        let now = self.clock.now_ms();
        let result = self.active_mut(Action::Rate)?.rate(value, now)?.clone();
        self.emit(result, sink)
    }

    fn emit<S: ResultSink + ?Sized>(
        &mut self,
        result: SessionResult,
        sink: &mut S,
    ) -> Result<SessionResult, TrainerError> {
        if let Err(err) = sink.record_result(&result) {
            warn!(session = %result.session_id, error = %err, "result not recorded");
            self.pending = Some(result);
            return Err(err.into());
        }
        self.completed += 1;
        Ok(result)
    }

    fn discard_pending(&mut self) {
        if let Some(result) = self.pending.take() {
            warn!(session = %result.session_id, "discarding unrecorded result");
        }
    }

    fn active(&self, action: Action) -> Result<&Session, SessionError> {
        self.session()
            .ok_or(SessionError::NoActiveSession { action })
    }

    fn active_mut(&mut self, action: Action) -> Result<&mut Session, SessionError> {
        match &mut self.state {
            TrainerState::Active(session) => Ok(session),
            TrainerState::Idle | TrainerState::Failed(_) => {
                Err(SessionError::NoActiveSession { action })
            }
        }
    }
}
