use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::session::Phase;

/// The three training protocols a session can run under
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrainingMode {
    Shape,
    Image,
    Location,
}

/// Modes decided by picking one candidate out of a fixed set.
/// These are the only modes that have a hit rate and a z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChoiceMode {
    Shape,
    Image,
}

pub const SHAPE_CANDIDATES: usize = 5;
pub const IMAGE_CANDIDATES: usize = 4;

/// Scale midpoint reported as the "expected" rating for location sessions
pub const LOCATION_EXPECTED_RATING: f64 = 3.0;

const CHOICE_PHASES: &[Phase] = &[Phase::Impression, Phase::Selection, Phase::Result];
const LOCATION_PHASES: &[Phase] = &[
    Phase::Impression,
    Phase::Reveal,
    Phase::Rating,
    Phase::Result,
];

impl TrainingMode {
    pub const ALL: [TrainingMode; 3] = [
        TrainingMode::Shape,
        TrainingMode::Image,
        TrainingMode::Location,
    ];

    /// Minimum trimmed impression length before the first proceed is allowed
    pub fn min_impression_len(self) -> usize {
        match self {
            TrainingMode::Shape => 5,
            TrainingMode::Image => 10,
            TrainingMode::Location => 20,
        }
    }

    /// Phases reachable in this mode, in order
    pub fn phases(self) -> &'static [Phase] {
        match self {
            TrainingMode::Shape | TrainingMode::Image => CHOICE_PHASES,
            TrainingMode::Location => LOCATION_PHASES,
        }
    }

    /// Expected value under pure guessing: a probability for the choice modes,
    /// the rating scale midpoint for location.
    pub fn expected_chance(self) -> f64 {
        self.choice_mode()
            .map_or(LOCATION_EXPECTED_RATING, ChoiceMode::chance_baseline)
    }

    pub fn choice_mode(self) -> Option<ChoiceMode> {
        match self {
            TrainingMode::Shape => Some(ChoiceMode::Shape),
            TrainingMode::Image => Some(ChoiceMode::Image),
            TrainingMode::Location => None,
        }
    }

    /// Human readable protocol name
    pub fn title(self) -> &'static str {
        match self {
            TrainingMode::Shape => "Shape Protocol",
            TrainingMode::Image => "Image Protocol",
            TrainingMode::Location => "Coordinate Protocol",
        }
    }
}

impl ChoiceMode {
    pub const ALL: [ChoiceMode; 2] = [ChoiceMode::Shape, ChoiceMode::Image];

    /// Probability of a hit by guessing (1/5 shapes, 1/4 images)
    pub fn chance_baseline(self) -> f64 {
        match self {
            ChoiceMode::Shape => 0.2,
            ChoiceMode::Image => 0.25,
        }
    }

    pub fn candidate_count(self) -> usize {
        match self {
            ChoiceMode::Shape => SHAPE_CANDIDATES,
            ChoiceMode::Image => IMAGE_CANDIDATES,
        }
    }
}

impl From<ChoiceMode> for TrainingMode {
    fn from(mode: ChoiceMode) -> Self {
        match mode {
            ChoiceMode::Shape => TrainingMode::Shape,
            ChoiceMode::Image => TrainingMode::Image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impression_thresholds_per_mode() {
        assert_eq!(TrainingMode::Shape.min_impression_len(), 5);
        assert_eq!(TrainingMode::Image.min_impression_len(), 10);
        assert_eq!(TrainingMode::Location.min_impression_len(), 20);
    }

    #[test]
    fn chance_baselines_match_candidate_counts() {
        for mode in ChoiceMode::ALL {
            assert_eq!(mode.chance_baseline(), 1.0 / mode.candidate_count() as f64);
        }
        assert_eq!(TrainingMode::Location.expected_chance(), 3.0);
    }

    #[test]
    fn phase_tables() {
        assert_eq!(
            TrainingMode::Shape.phases(),
            &[Phase::Impression, Phase::Selection, Phase::Result]
        );
        assert_eq!(TrainingMode::Image.phases(), TrainingMode::Shape.phases());
        assert_eq!(
            TrainingMode::Location.phases(),
            &[Phase::Impression, Phase::Reveal, Phase::Rating, Phase::Result]
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TrainingMode::Location).unwrap(),
            "\"location\""
        );
        assert_eq!(TrainingMode::Image.to_string(), "image");
        assert_eq!(ChoiceMode::Shape.to_string(), "shape");
    }

    #[test]
    fn choice_mode_conversion() {
        assert_eq!(TrainingMode::Shape.choice_mode(), Some(ChoiceMode::Shape));
        assert_eq!(TrainingMode::Location.choice_mode(), None);
        assert_eq!(TrainingMode::from(ChoiceMode::Image), TrainingMode::Image);
    }
}
