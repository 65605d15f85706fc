// Library surface for the CLI and for headless/integration tests.
pub mod analysis;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod console;
pub mod export;
pub mod fetch;
pub mod generator;
pub mod geocode;
pub mod mode;
pub mod outcome;
pub mod session;
pub mod sound;
pub mod stats;
pub mod store;
pub mod target;
pub mod trainer;
pub mod util;

pub use mode::TrainingMode;
pub use outcome::SessionResult;
pub use stats::{Stats, StatsStore};
pub use trainer::Trainer;
