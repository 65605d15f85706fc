use serde::{Deserialize, Serialize};

use crate::mode::TrainingMode;
use crate::target::Shape;

/// Lowest rating that still counts as a hit
pub const HIT_RATING_THRESHOLD: u8 = 3;

/// A self-assessed location rating on the 1..=5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_hit(self) -> bool {
        self.0 >= HIT_RATING_THRESHOLD
    }
}

impl TryFrom<u8> for Rating {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or(value)
    }
}

/// The user's single decision for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Choice {
    Shape(Shape),
    Image(usize),
    Rating(Rating),
}

impl Choice {
    pub fn mode(&self) -> TrainingMode {
        match self {
            Choice::Shape(_) => TrainingMode::Shape,
            Choice::Image(_) => TrainingMode::Image,
            Choice::Rating(_) => TrainingMode::Location,
        }
    }
}

/// Judged outcome of a decision, before it is flattened for storage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Choice { correct: bool },
    Rating { rating: Rating },
}

impl Decision {
    pub fn is_correct(&self) -> bool {
        match self {
            Decision::Choice { correct } => *correct,
            Decision::Rating { rating } => rating.is_hit(),
        }
    }
}

/// One completed session as recorded into history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: TrainingMode,
    pub session_id: String,
    /// Milliseconds since the Unix epoch at the moment of decision
    pub timestamp: i64,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl SessionResult {
    pub fn new(
        mode: TrainingMode,
        session_id: impl Into<String>,
        timestamp: i64,
        decision: Decision,
    ) -> Self {
        let rating = match decision {
            Decision::Rating { rating } => Some(rating.value()),
            Decision::Choice { .. } => None,
        };
        Self {
            mode,
            session_id: session_id.into(),
            timestamp,
            correct: decision.is_correct(),
            rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::try_from(5).map(Rating::value), Ok(5));
        assert_eq!(Rating::try_from(9), Err(9));
    }

    #[test]
    fn rating_three_is_a_hit() {
        assert!(Rating::new(3).unwrap().is_hit());
        assert!(!Rating::new(2).unwrap().is_hit());
    }

    #[test]
    fn location_result_carries_rating() {
        let rating = Rating::new(4).unwrap();
        let result = SessionResult::new(
            TrainingMode::Location,
            "LOC-1",
            1_700_000_000_000,
            Decision::Rating { rating },
        );
        assert!(result.correct);
        assert_eq!(result.rating, Some(4));
    }

    #[test]
    fn choice_result_omits_rating_on_the_wire() {
        let result = SessionResult::new(
            TrainingMode::Shape,
            "SHP-1",
            42,
            Decision::Choice { correct: false },
        );
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"mode":"shape","session_id":"SHP-1","timestamp":42,"correct":false}"#
        );
    }
}
