use std::io::Write;

use chrono::DateTime;
use itertools::Itertools;
use serde::Serialize;

use crate::mode::TrainingMode;
use crate::outcome::SessionResult;
use crate::stats::Stats;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    mode: TrainingMode,
    session_id: &'a str,
    timestamp: i64,
    recorded_at: String,
    correct: bool,
    rating: Option<u8>,
}

impl<'a> From<&'a SessionResult> for HistoryRow<'a> {
    fn from(r: &'a SessionResult) -> Self {
        Self {
            mode: r.mode,
            session_id: &r.session_id,
            timestamp: r.timestamp,
            recorded_at: DateTime::from_timestamp_millis(r.timestamp)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            correct: r.correct,
            rating: r.rating,
        }
    }
}

/// Write the retained history of every mode as CSV, oldest first.
/// Returns the number of rows written.
pub fn export_history<W: Write>(stats: &Stats, out: W) -> Result<usize, csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0;
    let merged = TrainingMode::ALL
        .iter()
        .map(|m| stats.history(*m).iter())
        .kmerge_by(|a, b| a.timestamp < b.timestamp);

    for result in merged {
        writer.serialize(HistoryRow::from(result))?;
        rows += 1;
    }
    if rows == 0 {
        writer.write_record([
            "mode",
            "session_id",
            "timestamp",
            "recorded_at",
            "correct",
            "rating",
        ])?;
    }
    writer.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Decision, Rating};

    #[test]
    fn exports_merged_chronologically() {
        let mut stats = Stats::default();
        stats.record(SessionResult::new(
            TrainingMode::Shape,
            "SHP-1",
            3_000,
            Decision::Choice { correct: true },
        ));
        stats.record(SessionResult::new(
            TrainingMode::Location,
            "LOC-1",
            1_000,
            Decision::Rating {
                rating: Rating::new(2).unwrap(),
            },
        ));
        stats.record(SessionResult::new(
            TrainingMode::Image,
            "IMG-1",
            2_000,
            Decision::Choice { correct: false },
        ));

        let mut buf = Vec::new();
        let rows = export_history(&stats, &mut buf).unwrap();
        assert_eq!(rows, 3);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "mode,session_id,timestamp,recorded_at,correct,rating");
        assert!(lines[1].starts_with("location,LOC-1,1000,1970-01-01T00:00:01"));
        assert!(lines[1].ends_with(",false,2"));
        assert!(lines[2].starts_with("image,IMG-1,2000,"));
        assert!(lines[3].starts_with("shape,SHP-1,3000,"));
        assert!(lines[3].ends_with(",true,"));
    }

    #[test]
    fn empty_history_still_has_header() {
        let mut buf = Vec::new();
        assert_eq!(export_history(&Stats::default(), &mut buf).unwrap(), 0);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "mode,session_id,timestamp,recorded_at,correct,rating\n"
        );
    }
}
