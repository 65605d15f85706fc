// Headless trainer flows over the local target generator and an in-memory store.
use assert_matches::assert_matches;

use rvtrain::clock::FixedClock;
use rvtrain::generator::{GeneratorConfig, TargetGenerator};
use rvtrain::geocode::{OfflineGeocoder, PlaceLabel};
use rvtrain::mode::ChoiceMode;
use rvtrain::outcome::Choice;
use rvtrain::session::{Phase, SessionError};
use rvtrain::stats::StatsStore;
use rvtrain::store::MemoryStore;
use rvtrain::target::Target;
use rvtrain::trainer::{Trainer, TrainerError, TrainerState};
use rvtrain::{SessionResult, TrainingMode};

fn seeded(seed: u64) -> TargetGenerator {
    TargetGenerator::new(GeneratorConfig {
        seed: Some(seed),
        ..GeneratorConfig::default()
    })
}

#[test]
fn shape_sessions_feed_the_aggregate() {
    let clock = FixedClock::stepping(1_700_000_000_000, 1_000);
    let mut trainer = Trainer::with_clock(TrainingMode::Shape, seeded(3), OfflineGeocoder, &clock);
    let mut stats = StatsStore::load(MemoryStore::new());

    for round in 0..12 {
        trainer.start();
        trainer.set_impressions("a rounded closed form").unwrap();
        assert_eq!(trainer.proceed().unwrap(), Phase::Selection);

        let Some(Target::Shape(t)) = trainer.target() else {
            panic!("expected a shape target");
        };
        // hit on even rounds only
        let pick = if round % 2 == 0 {
            t.target
        } else {
            *t.options.iter().find(|s| **s != t.target).unwrap()
        };
        let result = trainer.select(Choice::Shape(pick), &mut stats).unwrap();
        assert_eq!(result.correct, round % 2 == 0);
        assert!(result.session_id.starts_with("SHP-"));
        assert_eq!(trainer.phase(), Some(Phase::Result));
    }

    assert_eq!(trainer.completed(), 12);
    assert_eq!(stats.stats().total(TrainingMode::Shape), 12);
    assert_eq!(stats.hit_rate(ChoiceMode::Shape), 0.5);
    // (0.5 - 0.2) / sqrt(0.2 * 0.8 / 12)
    let expected = 0.3 / (0.16f64 / 12.0).sqrt();
    assert!((stats.z_score(ChoiceMode::Shape) - expected).abs() < 1e-9);
}

#[test]
fn image_selection_waits_for_every_candidate() {
    let clock = FixedClock::new(5);
    let mut trainer = Trainer::with_clock(TrainingMode::Image, seeded(11), OfflineGeocoder, &clock);
    let mut sink: Vec<SessionResult> = Vec::new();

    trainer.start();
    trainer.set_impressions("bright sky over water").unwrap();
    trainer.proceed().unwrap();

    let target_index = match trainer.target() {
        Some(Target::Image(t)) => t.target_index,
        other => panic!("unexpected target {other:?}"),
    };

    for i in 0..3 {
        trainer.mark_media_loaded(i).unwrap();
    }
    assert_matches!(
        trainer.select(Choice::Image(target_index), &mut sink),
        Err(TrainerError::Session(SessionError::MediaLoading { loaded: 3, total: 4 }))
    );
    assert!(sink.is_empty());

    trainer.mark_media_loaded(3).unwrap();
    let result = trainer.select(Choice::Image(target_index), &mut sink).unwrap();
    assert!(result.correct);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].timestamp, 5);
}

#[test]
fn location_session_reveals_then_rates() {
    let clock = FixedClock::new(9);
    let mut trainer =
        Trainer::with_clock(TrainingMode::Location, seeded(21), OfflineGeocoder, &clock);
    let mut stats = StatsStore::load(MemoryStore::new());

    trainer.start();
    trainer
        .set_impressions("cold wind, a long grey shoreline")
        .unwrap();
    assert_eq!(trainer.proceed().unwrap(), Phase::Reveal);
    let session = trainer.session().unwrap();
    assert_eq!(
        session.place(),
        Some(&PlaceLabel::Placeholder(PlaceLabel::FAILED))
    );

    assert_eq!(trainer.proceed().unwrap(), Phase::Rating);
    assert_matches!(
        trainer.rate(6, &mut stats),
        Err(TrainerError::Session(SessionError::RatingOutOfRange(6)))
    );
    let result = trainer.rate(4, &mut stats).unwrap();
    assert!(result.correct);
    assert_eq!(result.rating, Some(4));
    assert_eq!(stats.average_rating(), 4.0);
    assert_eq!(stats.stats().location.history.len(), 1);
}

#[test]
fn abandoned_session_records_nothing() {
    let mut trainer = Trainer::new(TrainingMode::Shape, seeded(1), OfflineGeocoder);
    let mut stats = StatsStore::load(MemoryStore::new());

    trainer.start();
    trainer.set_impressions("something sharp").unwrap();
    trainer.proceed().unwrap();
    trainer.abandon();

    assert_matches!(trainer.state(), TrainerState::Idle);
    assert_eq!(stats.stats().total_sessions(), 0);
    assert_matches!(
        trainer.select(Choice::Shape(rvtrain::target::Shape::Star), &mut stats),
        Err(TrainerError::Session(SessionError::NoActiveSession { .. }))
    );
}
