use thiserror::Error;

use crate::mode::TrainingMode;
use crate::target::Target;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("target source unreachable: {0}")]
    Unreachable(String),
    #[error("target source returned an invalid target: {0}")]
    InvalidTarget(String),
}

/// Supplies a fresh hidden target for a mode
pub trait TargetFetcher {
    fn fetch_target(&mut self, mode: TrainingMode) -> Result<Target, ConnectionError>;
}

impl<F: TargetFetcher + ?Sized> TargetFetcher for Box<F> {
    fn fetch_target(&mut self, mode: TrainingMode) -> Result<Target, ConnectionError> {
        (**self).fetch_target(mode)
    }
}

/// Fetch a target and check it is structurally sound and of the requested mode
pub fn fetch_valid<F: TargetFetcher + ?Sized>(
    fetcher: &mut F,
    mode: TrainingMode,
) -> Result<Target, ConnectionError> {
    let target = fetcher.fetch_target(mode)?;
    if target.mode() != mode {
        return Err(ConnectionError::InvalidTarget(format!(
            "asked for a {mode} target, got {}",
            target.mode()
        )));
    }
    target
        .validate()
        .map_err(|e| ConnectionError::InvalidTarget(e.to_string()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Shape, ShapeTarget};
    use assert_matches::assert_matches;

    struct Canned(Target);

    impl TargetFetcher for Canned {
        fn fetch_target(&mut self, _mode: TrainingMode) -> Result<Target, ConnectionError> {
            Ok(self.0.clone())
        }
    }

    fn shape(options: Vec<Shape>) -> Target {
        Target::Shape(ShapeTarget {
            session_id: "SHP-1".into(),
            target: Shape::Star,
            options,
        })
    }

    #[test]
    fn mode_mismatch_is_invalid() {
        let mut f = Canned(shape(Shape::ALL.to_vec()));
        assert_matches!(
            fetch_valid(&mut f, TrainingMode::Image),
            Err(ConnectionError::InvalidTarget(_))
        );
    }

    #[test]
    fn malformed_target_is_invalid() {
        let mut f = Canned(shape(vec![Shape::Star]));
        assert_matches!(
            fetch_valid(&mut f, TrainingMode::Shape),
            Err(ConnectionError::InvalidTarget(msg)) if msg.contains("expected 5")
        );
    }

    #[test]
    fn valid_target_passes_through() {
        let mut f: Box<dyn TargetFetcher> = Box::new(Canned(shape(Shape::ALL.to_vec())));
        let target = fetch_valid(&mut f, TrainingMode::Shape).unwrap();
        assert_eq!(target.session_id(), "SHP-1");
    }
}
