//! Per-target session state machine.
//!
//! One [`Session`] lives for exactly one fetched [`Target`]. It walks the
//! mode's phase table (`Impression → Selection → Result` for the choice
//! modes, `Impression → Reveal → Rating → Result` for location) and yields
//! a single [`SessionResult`] when the decision is made.

use thiserror::Error;
use tracing::debug;

use crate::geocode::PlaceLabel;
use crate::mode::TrainingMode;
use crate::outcome::{Choice, Decision, Rating, SessionResult};
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Impression,
    Selection,
    Reveal,
    Rating,
    Result,
}

impl Phase {
    /// The phase that follows this one in `mode`, if any
    pub fn next(self, mode: TrainingMode) -> Option<Phase> {
        let phases = mode.phases();
        let idx = phases.iter().position(|p| *p == self)?;
        phases.get(idx + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Result
    }
}

/// User-triggered actions, used to report what was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    EditImpressions,
    Proceed,
    MarkLoaded,
    Select,
    Rate,
    NextSession,
    Retry,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("impressions need at least {required} characters, got {actual}")]
    ImpressionTooShort { required: usize, actual: usize },
    #[error("candidate media still loading ({loaded}/{total})")]
    MediaLoading { loaded: usize, total: usize },
    #[error("{action} is not available during the {phase} phase")]
    InvalidAction { action: Action, phase: Phase },
    #[error("{action} needs an active session")]
    NoActiveSession { action: Action },
    #[error("{0} mode decision does not fit this session")]
    WrongMode(TrainingMode),
    #[error("candidate {0} is not part of this session")]
    UnknownCandidate(String),
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
}

#[derive(Debug, Clone)]
pub struct Session {
    target: Target,
    phase: Phase,
    impressions: String,
    media_loaded: Vec<bool>,
    place: Option<PlaceLabel>,
    choice: Option<Choice>,
    result: Option<SessionResult>,
}

impl Session {
    pub fn new(target: Target) -> Self {
        let media_loaded = vec![false; target.media_count()];
        Self {
            target,
            phase: Phase::Impression,
            impressions: String::new(),
            media_loaded,
            place: None,
            choice: None,
            result: None,
        }
    }

    pub fn mode(&self) -> TrainingMode {
        self.target.mode()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn impressions(&self) -> &str {
        &self.impressions
    }

    /// Place label resolved at reveal; `None` while the lookup is pending
    pub fn place(&self) -> Option<&PlaceLabel> {
        self.place.as_ref()
    }

    pub fn choice(&self) -> Option<Choice> {
        self.choice
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn set_impressions(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.require_phase(Action::EditImpressions, Phase::Impression)?;
        self.impressions = text.into();
        Ok(())
    }

    fn impression_len(&self) -> usize {
        self.impressions.trim().chars().count()
    }

    /// Whether `proceed` would succeed right now
    pub fn can_proceed(&self) -> bool {
        match self.phase {
            Phase::Impression => self.impression_len() >= self.mode().min_impression_len(),
            Phase::Reveal => true,
            Phase::Selection | Phase::Rating | Phase::Result => false,
        }
    }

    /// Advance to the next non-decision phase
    pub fn proceed(&mut self) -> Result<Phase, SessionError> {
        let next = self
            .phase
            .next(self.mode())
            .filter(|p| !p.is_terminal())
            .ok_or(SessionError::InvalidAction {
                action: Action::Proceed,
                phase: self.phase,
            })?;

        if self.phase == Phase::Impression {
            let required = self.mode().min_impression_len();
            let actual = self.impression_len();
            if actual < required {
                return Err(SessionError::ImpressionTooShort { required, actual });
            }
        }

        debug!(session = self.target.session_id(), from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        Ok(next)
    }

    pub fn mark_media_loaded(&mut self, index: usize) -> Result<(), SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::InvalidAction {
                action: Action::MarkLoaded,
                phase: self.phase,
            });
        }
        let slot = self
            .media_loaded
            .get_mut(index)
            .ok_or_else(|| SessionError::UnknownCandidate(index.to_string()))?;
        *slot = true;
        Ok(())
    }

    pub fn loaded_media(&self) -> usize {
        self.media_loaded.iter().filter(|l| **l).count()
    }

    pub fn all_media_loaded(&self) -> bool {
        self.media_loaded.iter().all(|l| *l)
    }

    /// Whether a candidate may be picked right now
    pub fn can_select(&self) -> bool {
        self.phase == Phase::Selection && self.all_media_loaded()
    }

    pub fn set_place(&mut self, place: PlaceLabel) {
        self.place = Some(place);
    }

    /// Make the session's one decision and enter `Result`.
    ///
    /// `timestamp` is milliseconds since the epoch at decision time.
    pub fn decide(&mut self, choice: Choice, timestamp: i64) -> Result<&SessionResult, SessionError> {
        if choice.mode() != self.mode() {
            return Err(SessionError::WrongMode(choice.mode()));
        }

        let (action, required) = match choice {
            Choice::Rating(_) => (Action::Rate, Phase::Rating),
            Choice::Shape(_) | Choice::Image(_) => (Action::Select, Phase::Selection),
        };
        self.require_phase(action, required)?;

        if !self.all_media_loaded() {
            return Err(SessionError::MediaLoading {
                loaded: self.loaded_media(),
                total: self.media_loaded.len(),
            });
        }

        let decision = self.judge(&choice)?;
        let result = SessionResult::new(
            self.mode(),
            self.target.session_id(),
            timestamp,
            decision,
        );

        debug!(session = self.target.session_id(), correct = result.correct, "decision made");
        self.choice = Some(choice);
        self.phase = Phase::Result;
        Ok(self.result.insert(result))
    }

    pub fn select(&mut self, choice: Choice, timestamp: i64) -> Result<&SessionResult, SessionError> {
        if matches!(choice, Choice::Rating(_)) {
            return Err(SessionError::InvalidAction {
                action: Action::Rate,
                phase: self.phase,
            });
        }
        self.decide(choice, timestamp)
    }

    pub fn rate(&mut self, value: u8, timestamp: i64) -> Result<&SessionResult, SessionError> {
        let rating = Rating::new(value).ok_or(SessionError::RatingOutOfRange(value))?;
        self.decide(Choice::Rating(rating), timestamp)
    }

    /// Per-mode correctness predicate
    fn judge(&self, choice: &Choice) -> Result<Decision, SessionError> {
        match (&self.target, choice) {
            (Target::Shape(t), Choice::Shape(shape)) => {
                if !t.options.contains(shape) {
                    return Err(SessionError::UnknownCandidate(shape.to_string()));
                }
                Ok(Decision::Choice {
                    correct: *shape == t.target,
                })
            }
            (Target::Image(t), Choice::Image(index)) => {
                if *index >= t.images.len() {
                    return Err(SessionError::UnknownCandidate(index.to_string()));
                }
                Ok(Decision::Choice {
                    correct: *index == t.target_index,
                })
            }
            (Target::Location(_), Choice::Rating(rating)) => Ok(Decision::Rating { rating: *rating }),
            (_, other) => Err(SessionError::WrongMode(other.mode())),
        }
    }

    fn require_phase(&self, action: Action, phase: Phase) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidAction {
                action,
                phase: self.phase,
            })
        }
    }
}
