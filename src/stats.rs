use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::mode::{ChoiceMode, TrainingMode};
use crate::outcome::{Rating, SessionResult};
use crate::store::{KeyValueStore, StoreError};
use crate::util::{proportion_z_score, ratio};

/// Storage key for the aggregate
pub const STATS_KEY: &str = "rv-training-stats";

/// Most recent results retained per mode
pub const HISTORY_LIMIT: usize = 100;

/// Below this many trials the z-score is reported as 0
pub const MIN_TRIALS_FOR_Z: u64 = 10;

/// Aggregate for a mode scored by hit/miss
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitStats {
    pub total: u64,
    pub correct: u64,
    pub history: VecDeque<SessionResult>,
}

/// Aggregate for the rated location mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub total: u64,
    pub total_rating: u64,
    pub history: VecDeque<SessionResult>,
}

/// All-time outcomes per mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub shape: HitStats,
    pub image: HitStats,
    pub location: RatingStats,
}

fn push_capped(history: &mut VecDeque<SessionResult>, result: SessionResult) {
    history.push_back(result);
    while history.len() > HISTORY_LIMIT {
        history.pop_front();
    }
}

impl Stats {
    pub fn record(&mut self, result: SessionResult) {
        match result.mode {
            TrainingMode::Location => {
                let agg = &mut self.location;
                agg.total = agg.total.saturating_add(1);
                agg.total_rating = agg
                    .total_rating
                    .saturating_add(u64::from(result.rating.unwrap_or(0)));
                push_capped(&mut agg.history, result);
            }
            TrainingMode::Shape | TrainingMode::Image => {
                let agg = if result.mode == TrainingMode::Shape {
                    &mut self.shape
                } else {
                    &mut self.image
                };
                agg.total = agg.total.saturating_add(1);
                if result.correct {
                    agg.correct = agg.correct.saturating_add(1);
                }
                push_capped(&mut agg.history, result);
            }
        }
    }

    pub fn hits(&self, mode: ChoiceMode) -> &HitStats {
        match mode {
            ChoiceMode::Shape => &self.shape,
            ChoiceMode::Image => &self.image,
        }
    }

    pub fn total(&self, mode: TrainingMode) -> u64 {
        match mode {
            TrainingMode::Shape => self.shape.total,
            TrainingMode::Image => self.image.total,
            TrainingMode::Location => self.location.total,
        }
    }

    pub fn history(&self, mode: TrainingMode) -> &VecDeque<SessionResult> {
        match mode {
            TrainingMode::Shape => &self.shape.history,
            TrainingMode::Image => &self.image.history,
            TrainingMode::Location => &self.location.history,
        }
    }

    pub fn total_sessions(&self) -> u64 {
        self.shape
            .total
            .saturating_add(self.image.total)
            .saturating_add(self.location.total)
    }

    /// `correct / total`, 0 when nothing has been recorded
    pub fn hit_rate(&self, mode: ChoiceMode) -> f64 {
        let agg = self.hits(mode);
        ratio(agg.correct, agg.total)
    }

    /// All-time mean location rating, 0 when nothing has been recorded
    pub fn average_rating(&self) -> f64 {
        ratio(self.location.total_rating, self.location.total)
    }

    /// One-sample proportion z-score of the hit rate against chance.
    /// 0 below [`MIN_TRIALS_FOR_Z`] trials.
    pub fn z_score(&self, mode: ChoiceMode) -> f64 {
        let agg = self.hits(mode);
        if agg.total < MIN_TRIALS_FOR_Z {
            return 0.0;
        }
        proportion_z_score(self.hit_rate(mode), mode.chance_baseline(), agg.total).unwrap_or(0.0)
    }

    /// Structural invariants a persisted aggregate must satisfy. Totals must
    /// leave room for another session.
    pub fn is_consistent(&self) -> bool {
        let hits_ok = |agg: &HitStats, mode: TrainingMode| {
            agg.total < u64::MAX
                && agg.correct <= agg.total
                && agg.history.len() as u64 <= agg.total
                && agg.history.len() <= HISTORY_LIMIT
                && agg.history.iter().all(|r| r.mode == mode)
        };
        let loc = &self.location;
        hits_ok(&self.shape, TrainingMode::Shape)
            && hits_ok(&self.image, TrainingMode::Image)
            && loc
                .total
                .checked_add(1)
                .and_then(|n| n.checked_mul(u64::from(Rating::MAX)))
                .is_some()
            && loc.total_rating <= loc.total * u64::from(Rating::MAX)
            && loc.history.len() as u64 <= loc.total
            && loc.history.len() <= HISTORY_LIMIT
            && loc.history.iter().all(|r| r.mode == TrainingMode::Location)
    }
}

/// Receives each completed session's result
pub trait ResultSink {
    fn record_result(&mut self, result: &SessionResult) -> Result<(), StoreError>;
}

impl ResultSink for Vec<SessionResult> {
    fn record_result(&mut self, result: &SessionResult) -> Result<(), StoreError> {
        self.push(result.clone());
        Ok(())
    }
}

/// The aggregate kept in sync with a key-value store
#[derive(Debug)]
pub struct StatsStore<K: KeyValueStore> {
    kv: K,
    stats: Stats,
}

impl<K: KeyValueStore> StatsStore<K> {
    /// Load the persisted aggregate, falling back to empty on any read or parse problem
    pub fn load(kv: K) -> Self {
        let stats = match kv.get(STATS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Stats>(&raw) {
                Ok(stats) if stats.is_consistent() => stats,
                Ok(_) => {
                    warn!("stored statistics violate invariants, starting fresh");
                    Stats::default()
                }
                Err(err) => {
                    warn!(error = %err, "stored statistics unreadable, starting fresh");
                    Stats::default()
                }
            },
            Ok(None) => Stats::default(),
            Err(err) => {
                warn!(error = %err, "could not read statistics, starting fresh");
                Stats::default()
            }
        };
        Self { kv, stats }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    /// Fold one result into the aggregate. The new aggregate is written in one
    /// store write before it replaces the in-memory copy.
    pub fn record_result(&mut self, result: &SessionResult) -> Result<(), StoreError> {
        let mut next = self.stats.clone();
        next.record(result.clone());
        let encoded = serde_json::to_string(&next)?;
        self.kv.set(STATS_KEY, &encoded)?;
        self.stats = next;
        info!(
            mode = %result.mode,
            session = %result.session_id,
            correct = result.correct,
            "recorded session result"
        );
        Ok(())
    }

    /// Reset every mode to empty and drop the persisted copy
    pub fn clear_stats(&mut self) -> Result<(), StoreError> {
        self.kv.remove(STATS_KEY)?;
        self.stats = Stats::default();
        info!("statistics cleared");
        Ok(())
    }

    pub fn hit_rate(&self, mode: ChoiceMode) -> f64 {
        self.stats.hit_rate(mode)
    }

    pub fn average_rating(&self) -> f64 {
        self.stats.average_rating()
    }

    pub fn z_score(&self, mode: ChoiceMode) -> f64 {
        self.stats.z_score(mode)
    }
}

impl<K: KeyValueStore> ResultSink for StatsStore<K> {
    fn record_result(&mut self, result: &SessionResult) -> Result<(), StoreError> {
        StatsStore::record_result(self, result)
    }
}
