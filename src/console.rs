//! Line-oriented terminal driver for a training run.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::clock::Clock;
use crate::fetch::TargetFetcher;
use crate::geocode::ReverseGeocoder;
use crate::outcome::Choice;
use crate::session::{Phase, Session, SessionError};
use crate::sound::{SoundBackend, SoundCue, SoundSystem};
use crate::stats::ResultSink;
use crate::target::{Shape, Target};
use crate::trainer::{Trainer, TrainerError, TrainerState};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Trainer(#[from] TrainerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    /// A session was left before reaching its result
    pub abandoned: bool,
}

enum Step {
    Start,
    Failed(String),
    Phase(Phase),
}

pub struct Console<R: BufRead, W: Write> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Print `msg` and read one trimmed line; `None` on end of input
    fn prompt(&mut self, msg: &str) -> io::Result<Option<String>> {
        write!(self.out, "{msg} ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm(&mut self, msg: &str) -> io::Result<bool> {
        Ok(match self.prompt(msg)? {
            Some(answer) => !matches!(answer.to_lowercase().as_str(), "n" | "no" | "q"),
            None => false,
        })
    }

    /// Run sessions until input ends, the user declines another session,
    /// or `max_sessions` have completed.
    pub fn run<F, G, C, S, B>(
        &mut self,
        trainer: &mut Trainer<F, G, C>,
        sink: &mut S,
        sound: &mut SoundSystem<B>,
        max_sessions: Option<usize>,
    ) -> Result<RunSummary, RunError>
    where
        F: TargetFetcher,
        G: ReverseGeocoder,
        C: Clock,
        S: ResultSink + ?Sized,
        B: SoundBackend,
    {
        let started_with = trainer.completed();
        let finish = |completed: usize, abandoned: bool| RunSummary {
            completed: completed - started_with,
            abandoned,
        };

        loop {
            let step = match trainer.state() {
                TrainerState::Idle => Step::Start,
                TrainerState::Failed(err) => Step::Failed(err.to_string()),
                TrainerState::Active(session) => Step::Phase(session.phase()),
            };

            match step {
                Step::Start => {
                    writeln!(self.out, "INITIALIZING SESSION...")?;
                    trainer.start();
                }
                Step::Failed(err) => {
                    writeln!(self.out, "Failed to connect to target source: {err}")?;
                    if !self.confirm("Retry connection? [Y/n]")? {
                        return Ok(finish(trainer.completed(), false));
                    }
                    trainer.retry().map_err(TrainerError::from)?;
                }
                Step::Phase(Phase::Impression) => {
                    if let Some(session) = trainer.session() {
                        self.show_briefing(session)?;
                    }
                    let required = trainer.mode().min_impression_len();
                    let Some(text) =
                        self.prompt(&format!("Record your impressions (min {required} chars):"))?
                    else {
                        trainer.abandon();
                        return Ok(finish(trainer.completed(), true));
                    };
                    sound.note_interaction();
                    trainer.set_impressions(text).map_err(TrainerError::from)?;
                    match trainer.proceed() {
                        Ok(Phase::Reveal) => {
                            sound.play(SoundCue::Reveal);
                        }
                        Ok(_) => {
                            sound.play(SoundCue::Click);
                        }
                        Err(err @ SessionError::ImpressionTooShort { .. }) => {
                            writeln!(self.out, "{err}")?;
                        }
                        Err(err) => return Err(TrainerError::from(err).into()),
                    }
                }
                Step::Phase(Phase::Selection) => {
                    let candidates = match trainer.session() {
                        Some(session) => self.show_candidates(session)?,
                        None => 0,
                    };
                    // links are printed in full, nothing left to load
                    for i in 0..trainer.target().map(Target::media_count).unwrap_or(0) {
                        trainer.mark_media_loaded(i).map_err(TrainerError::from)?;
                    }
                    let Some(answer) = self.prompt(&format!("Select (1-{candidates}):"))? else {
                        trainer.abandon();
                        return Ok(finish(trainer.completed(), true));
                    };
                    let Some(choice) = trainer.target().and_then(|t| parse_choice(t, &answer))
                    else {
                        writeln!(self.out, "Not a candidate: {answer}")?;
                        continue;
                    };
                    match trainer.select(choice, sink) {
                        Ok(result) => {
                            sound.play(SoundCue::for_outcome(result.correct));
                        }
                        Err(TrainerError::Storage(err)) => {
                            writeln!(self.out, "Result could not be saved: {err}")?;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Step::Phase(Phase::Reveal) => {
                    if let Some(session) = trainer.session() {
                        self.show_reveal(session)?;
                    }
                    if self.prompt("Press Enter to rate the session.")?.is_none() {
                        trainer.abandon();
                        return Ok(finish(trainer.completed(), true));
                    }
                    trainer.proceed().map_err(TrainerError::from)?;
                    sound.play(SoundCue::Click);
                }
                Step::Phase(Phase::Rating) => {
                    let Some(answer) =
                        self.prompt("How well did your impressions match? (1-5):")?
                    else {
                        trainer.abandon();
                        return Ok(finish(trainer.completed(), true));
                    };
                    let Ok(value) = answer.parse::<u8>() else {
                        writeln!(self.out, "Enter a number from 1 to 5")?;
                        continue;
                    };
                    match trainer.rate(value, sink) {
                        Ok(result) => {
                            sound.play(SoundCue::for_outcome(result.correct));
                        }
                        Err(TrainerError::Session(err @ SessionError::RatingOutOfRange(_))) => {
                            writeln!(self.out, "{err}")?;
                        }
                        Err(TrainerError::Storage(err)) => {
                            writeln!(self.out, "Result could not be saved: {err}")?;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Step::Phase(Phase::Result) => {
                    if trainer.pending_result().is_some() {
                        if !self.confirm("Retry saving the result? [Y/n]")? {
                            trainer.abandon();
                            return Ok(finish(trainer.completed(), true));
                        }
                        if let Err(err) = trainer.record_pending(sink) {
                            writeln!(self.out, "Result could not be saved: {err}")?;
                        }
                        continue;
                    }
                    if let Some(session) = trainer.session() {
                        self.show_result(session)?;
                    }
                    let done = trainer.completed() - started_with;
                    if max_sessions.is_some_and(|max| done >= max)
                        || !self.confirm("Next session? [Y/n]")?
                    {
                        return Ok(finish(trainer.completed(), false));
                    }
                    sound.play(SoundCue::Click);
                    trainer.next_session().map_err(TrainerError::from)?;
                }
            }
        }
    }

    fn show_briefing(&mut self, session: &Session) -> io::Result<()> {
        let target = session.target();
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{} [{}]",
            target.mode().title(),
            target.session_id()
        )?;
        match target {
            Target::Location(t) => {
                writeln!(self.out, "TARGET COORDINATES: {}", t.coords_display)?;
                if let Some(region) = &t.region {
                    writeln!(self.out, "REGION: {region}")?;
                }
            }
            Target::Shape(_) | Target::Image(_) => {
                writeln!(self.out, "TARGET LOCKED - AWAITING IMPRESSION INPUT")?;
            }
        }
        Ok(())
    }

    /// Returns the number of candidates shown
    fn show_candidates(&mut self, session: &Session) -> io::Result<usize> {
        match session.target() {
            Target::Shape(t) => {
                writeln!(self.out, "SELECT THE SHAPE THAT MATCHES YOUR IMPRESSIONS:")?;
                for (i, shape) in t.options.iter().enumerate() {
                    writeln!(self.out, "  {}) {} {}", i + 1, shape.symbol(), shape)?;
                }
                Ok(t.options.len())
            }
            Target::Image(t) => {
                writeln!(self.out, "SELECT THE IMAGE THAT MATCHES YOUR IMPRESSIONS:")?;
                for (i, img) in t.images.iter().enumerate() {
                    writeln!(self.out, "  {}) {}", i + 1, img.url)?;
                }
                Ok(t.images.len())
            }
            Target::Location(_) => Ok(0),
        }
    }

    fn show_reveal(&mut self, session: &Session) -> io::Result<()> {
        if let Target::Location(t) = session.target() {
            writeln!(self.out, "TARGET REVEALED: {}", t.coords_display)?;
            match session.place() {
                Some(place) => writeln!(self.out, "Place: {place}")?,
                None => writeln!(self.out, "Place: (looking up...)")?,
            }
            if let Some(url) = &t.map_url {
                writeln!(self.out, "Map: {url}")?;
            }
        }
        Ok(())
    }

    fn show_result(&mut self, session: &Session) -> io::Result<()> {
        let Some(result) = session.result() else {
            return Ok(());
        };
        writeln!(self.out)?;
        writeln!(self.out, "{}", if result.correct { "✓ HIT" } else { "✗ MISS" })?;
        match (session.target(), session.choice()) {
            (Target::Shape(t), Some(Choice::Shape(picked))) => {
                writeln!(
                    self.out,
                    "Target was: {} {}",
                    t.target.symbol(),
                    t.target.to_string().to_uppercase()
                )?;
                if picked != t.target {
                    writeln!(self.out, "You selected: {} {}", picked.symbol(), picked)?;
                }
            }
            (Target::Image(t), Some(Choice::Image(picked))) => {
                writeln!(self.out, "Target was image {}", t.target_index + 1)?;
                if picked != t.target_index {
                    writeln!(self.out, "You selected image {}", picked + 1)?;
                }
            }
            (Target::Location(t), Some(Choice::Rating(rating))) => {
                writeln!(
                    self.out,
                    "Rating: {}/5 for {}",
                    rating.value(),
                    t.coords_display
                )?;
            }
            _ => {}
        }
        writeln!(self.out, "Your impressions were: {}", session.impressions())?;
        Ok(())
    }
}

/// Interpret an answer as a 1-based candidate number, or a shape name
fn parse_choice(target: &Target, answer: &str) -> Option<Choice> {
    let number = answer.parse::<usize>().ok().filter(|n| *n >= 1).map(|n| n - 1);
    match target {
        Target::Shape(t) => match number {
            Some(i) => t.options.get(i).copied().map(Choice::Shape),
            None => Shape::from_name(answer)
                .filter(|s| t.options.contains(s))
                .map(Choice::Shape),
        },
        Target::Image(t) => number.filter(|i| *i < t.images.len()).map(Choice::Image),
        Target::Location(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::fetch::ConnectionError;
    use crate::geocode::OfflineGeocoder;
    use crate::mode::TrainingMode;
    use crate::outcome::SessionResult;
    use crate::sound::SilentBackend;
    use crate::target::ShapeTarget;
    use std::io::Cursor;

    struct Fixed(Option<Target>);

    impl TargetFetcher for Fixed {
        fn fetch_target(&mut self, _mode: TrainingMode) -> Result<Target, ConnectionError> {
            self.0
                .clone()
                .ok_or_else(|| ConnectionError::Unreachable("down".into()))
        }
    }

    fn star() -> Target {
        Target::Shape(ShapeTarget {
            session_id: "SHP-55555".into(),
            target: Shape::Star,
            options: Shape::ALL.to_vec(),
        })
    }

    fn run(
        fetcher: Fixed,
        input: &str,
        max: Option<usize>,
    ) -> (RunSummary, Vec<SessionResult>, String) {
        let clock = FixedClock::new(1);
        let mut trainer =
            Trainer::with_clock(TrainingMode::Shape, fetcher, OfflineGeocoder, &clock);
        let mut sink: Vec<SessionResult> = Vec::new();
        let mut sound = SoundSystem::new(false, || SilentBackend);
        let mut console = Console::new(Cursor::new(input.to_string()), Vec::new());
        let summary = console
            .run(&mut trainer, &mut sink, &mut sound, max)
            .unwrap();
        let out = String::from_utf8(console.into_output()).unwrap();
        (summary, sink, out)
    }

    #[test]
    fn shape_session_by_name() {
        let (summary, sink, out) = run(Fixed(Some(star())), "pointy bright\nstar\nn\n", None);
        assert_eq!(
            summary,
            RunSummary {
                completed: 1,
                abandoned: false
            }
        );
        assert_eq!(sink.len(), 1);
        assert!(sink[0].correct);
        assert!(out.contains("✓ HIT"));
        assert!(out.contains("SHP-55555"));
    }

    #[test]
    fn short_impressions_reprompt() {
        let (_, sink, out) = run(Fixed(Some(star())), "hm\nround soft edges\n1\n", Some(1));
        assert!(out.contains("impressions need at least 5 characters, got 2"));
        assert_eq!(sink.len(), 1);
        assert!(!sink[0].correct);
        assert!(out.contains("You selected: ◯ circle"));
    }

    #[test]
    fn end_of_input_abandons_without_recording() {
        let (summary, sink, _) = run(Fixed(Some(star())), "pointy bright\n", None);
        assert!(summary.abandoned);
        assert_eq!(summary.completed, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn failed_fetch_offers_retry() {
        let (summary, sink, out) = run(Fixed(None), "n\n", None);
        assert!(out.contains("Failed to connect to target source"));
        assert_eq!(summary.completed, 0);
        assert!(sink.is_empty());
    }

    struct FailsOnce {
        failed: bool,
        saved: Vec<SessionResult>,
    }

    impl ResultSink for FailsOnce {
        fn record_result(
            &mut self,
            result: &SessionResult,
        ) -> Result<(), crate::store::StoreError> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
            }
            self.saved.push(result.clone());
            Ok(())
        }
    }

    #[test]
    fn failed_save_is_retried_on_request() {
        let clock = FixedClock::new(1);
        let mut trainer =
            Trainer::with_clock(TrainingMode::Shape, Fixed(Some(star())), OfflineGeocoder, &clock);
        let mut sink = FailsOnce {
            failed: false,
            saved: Vec::new(),
        };
        let mut sound = SoundSystem::new(false, || SilentBackend);
        let input = "pointy bright\n3\ny\nn\n";
        let mut console = Console::new(Cursor::new(input.to_string()), Vec::new());
        let summary = console
            .run(&mut trainer, &mut sink, &mut sound, None)
            .unwrap();
        let out = String::from_utf8(console.into_output()).unwrap();

        assert!(out.contains("Result could not be saved: io error: disk full"));
        assert!(out.contains("✓ HIT"));
        assert_eq!(summary.completed, 1);
        assert_eq!(sink.saved.len(), 1);
    }

    #[test]
    fn declining_to_retry_save_abandons() {
        let clock = FixedClock::new(1);
        let mut trainer =
            Trainer::with_clock(TrainingMode::Shape, Fixed(Some(star())), OfflineGeocoder, &clock);
        let mut sink = FailsOnce {
            failed: false,
            saved: Vec::new(),
        };
        let mut sound = SoundSystem::new(false, || SilentBackend);
        let mut console = Console::new(Cursor::new("pointy bright\n3\nn\n".to_string()), Vec::new());
        let summary = console
            .run(&mut trainer, &mut sink, &mut sound, None)
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                completed: 0,
                abandoned: true
            }
        );
        assert!(sink.saved.is_empty());
        assert!(trainer.pending_result().is_none());
    }

    #[test]
    fn parse_choice_rules() {
        let target = star();
        assert_eq!(parse_choice(&target, "3"), Some(Choice::Shape(Shape::Star)));
        assert_eq!(parse_choice(&target, "0"), None);
        assert_eq!(parse_choice(&target, "6"), None);
        assert_eq!(parse_choice(&target, "Waves"), Some(Choice::Shape(Shape::Waves)));
    }
}
