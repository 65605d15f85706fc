//! Interpretation of the aggregate for display: significance bands,
//! comparison against chance, and the text report printed by `rvtrain stats`.

use std::fmt;

use itertools::Itertools;

use crate::mode::{ChoiceMode, TrainingMode};
use crate::stats::{Stats, MIN_TRIALS_FOR_Z};

/// Trials recommended before reading much into a z-score
pub const RELIABLE_TRIALS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Significance {
    InsufficientTrials,
    Preliminary,
    NotSignificant,
    Marginal,
    Significant,
    HighlySignificant,
}

impl Significance {
    pub fn classify(z: f64, trials: u64) -> Self {
        if trials < MIN_TRIALS_FOR_Z {
            return Significance::InsufficientTrials;
        }
        if trials < RELIABLE_TRIALS {
            return Significance::Preliminary;
        }
        let abs_z = z.abs();
        if abs_z >= 2.576 {
            Significance::HighlySignificant
        } else if abs_z >= 1.96 {
            Significance::Significant
        } else if abs_z >= 1.645 {
            Significance::Marginal
        } else {
            Significance::NotSignificant
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Significance::InsufficientTrials => "Need more trials (min 10)",
            Significance::Preliminary => "Preliminary data (need 30+ trials)",
            Significance::NotSignificant => "Not statistically significant",
            Significance::Marginal => "Marginally significant (p < 0.10)",
            Significance::Significant => "Significant (p < 0.05)",
            Significance::HighlySignificant => "Highly significant (p < 0.01)",
        })
    }
}

/// Observed hit rate relative to the chance baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChanceComparison {
    Above(f64),
    Below(f64),
    AtChance,
}

impl ChanceComparison {
    pub fn between(observed: f64, expected: f64) -> Self {
        let diff = observed - expected;
        if diff > 0.0 {
            ChanceComparison::Above(diff)
        } else if diff < 0.0 {
            ChanceComparison::Below(diff)
        } else {
            ChanceComparison::AtChance
        }
    }
}

impl fmt::Display for ChanceComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChanceComparison::Above(d) => write!(f, "+{:.1}% above chance", d * 100.0),
            ChanceComparison::Below(d) => write!(f, "{:.1}% below chance", d * 100.0),
            ChanceComparison::AtChance => f.write_str("At chance level"),
        }
    }
}

/// Count of each rating, 5 down to 1, over the retained location history.
///
/// Shares derived from these counts use the retained history length as the
/// denominator, not the all-time `location.total`, so they sum to 100% once
/// older sessions have been evicted.
pub fn rating_distribution(stats: &Stats) -> [(u8, usize); 5] {
    let counts = stats
        .location
        .history
        .iter()
        .filter_map(|r| r.rating)
        .counts();
    [5, 4, 3, 2, 1].map(|r| (r, counts.get(&r).copied().unwrap_or(0)))
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Snapshot of one choice mode for display
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceSummary {
    pub mode: ChoiceMode,
    pub total: u64,
    pub correct: u64,
    pub hit_rate: f64,
    pub z_score: f64,
    pub comparison: ChanceComparison,
    pub significance: Significance,
}

impl ChoiceSummary {
    pub fn from_stats(stats: &Stats, mode: ChoiceMode) -> Self {
        let agg = stats.hits(mode);
        let hit_rate = stats.hit_rate(mode);
        let z_score = stats.z_score(mode);
        Self {
            mode,
            total: agg.total,
            correct: agg.correct,
            hit_rate,
            z_score,
            comparison: ChanceComparison::between(hit_rate, mode.chance_baseline()),
            significance: Significance::classify(z_score, agg.total),
        }
    }
}

/// Full statistics report
#[derive(Debug, Clone)]
pub struct StatsReport<'a> {
    stats: &'a Stats,
}

impl<'a> StatsReport<'a> {
    pub fn new(stats: &'a Stats) -> Self {
        Self { stats }
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        if stats.total_sessions() == 0 {
            return writeln!(f, "No data yet. Complete training sessions to see statistics.");
        }

        writeln!(f, "Total sessions: {}", stats.total_sessions())?;
        for mode in TrainingMode::ALL {
            writeln!(f, "  {:<9} {}", mode.to_string(), stats.total(mode))?;
        }

        for mode in ChoiceMode::ALL {
            let s = ChoiceSummary::from_stats(stats, mode);
            if s.total == 0 {
                continue;
            }
            let title = TrainingMode::from(mode).title().to_uppercase();
            writeln!(f)?;
            writeln!(f, "{title} ANALYSIS")?;
            writeln!(
                f,
                "  Hit rate:     {} ({})",
                format_percent(s.hit_rate),
                s.comparison
            )?;
            writeln!(f, "  Hits:         {} / {}", s.correct, s.total)?;
            let z = if s.total >= MIN_TRIALS_FOR_Z {
                format!("{:.2}", s.z_score)
            } else {
                "N/A".to_string()
            };
            writeln!(f, "  Z-score:      {z} ({})", s.significance)?;
            writeln!(
                f,
                "  Chance:       {}",
                format_percent(mode.chance_baseline())
            )?;
        }

        let loc = &stats.location;
        if loc.total > 0 {
            let avg = stats.average_rating();
            writeln!(f)?;
            writeln!(f, "{} ANALYSIS", TrainingMode::Location.title().to_uppercase())?;
            writeln!(
                f,
                "  Avg rating:   {avg:.2} / 5 ({})",
                if avg >= TrainingMode::Location.expected_chance() {
                    "Above middle rating"
                } else {
                    "Below middle rating"
                }
            )?;
            writeln!(f, "  Sessions:     {}", loc.total)?;
            // share of retained history, not of the all-time total
            let retained = loc.history.len();
            for (rating, count) in rating_distribution(stats) {
                let share = if retained > 0 {
                    count as f64 / retained as f64
                } else {
                    0.0
                };
                writeln!(f, "  {rating}★: {count:>4} ({:.0}%)", share * 100.0)?;
            }
        }

        if let Some(last) = TrainingMode::ALL
            .iter()
            .filter_map(|m| stats.history(*m).back())
            .map(|r| r.timestamp)
            .max()
        {
            if let Some(at) = chrono::DateTime::from_timestamp_millis(last) {
                writeln!(f)?;
                writeln!(f, "Last session: {}", at.format("%Y-%m-%d %H:%M UTC"))?;
            }
        }

        Ok(())
    }
}
