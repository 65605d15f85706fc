use clap::{Parser, Subcommand, ValueEnum};
use std::{
    error::Error,
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rvtrain::{
    analysis::StatsReport,
    config::{Config, ConfigStore, FileConfigStore},
    console::Console,
    export::export_history,
    generator::{GeneratorConfig, TargetGenerator},
    geocode::OfflineGeocoder,
    sound::{self, SoundSystem, TerminalBell},
    stats::StatsStore,
    store::SqliteStore,
    trainer::Trainer,
    TrainingMode,
};

/// perception training sessions with hit-rate and significance tracking
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Run shape, image and coordinate perception sessions against hidden targets, and track hit rates, ratings and z-scores against chance."
)]
pub struct Cli {
    /// path to a JSON config file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// path to the statistics database
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// log debug output to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// run training sessions (default)
    Train {
        /// protocol to train, defaults to the configured mode
        #[clap(value_enum)]
        mode: Option<TrainingMode>,

        /// seed target generation for reproducible runs
        #[clap(long)]
        seed: Option<u64>,

        /// stop after this many completed sessions
        #[clap(short = 'n', long)]
        sessions: Option<usize>,
    },
    /// print the statistics report
    Stats,
    /// erase all recorded statistics
    Clear,
    /// write retained session history as CSV
    Export {
        /// output file, stdout when omitted
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// show or change the sound preference
    Sound {
        #[clap(value_enum)]
        setting: Option<SoundSetting>,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum SoundSetting {
    On,
    Off,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(cli: &Cli, config: &Config) -> Result<SqliteStore, Box<dyn Error>> {
    let store = match cli.db.as_ref().or(config.db_path.as_ref()) {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_default()?,
    };
    Ok(store)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    debug!(path = %config_store.path().display(), "loading config");
    let config = config_store.load();

    match &cli.command {
        None => train(&cli, &config, config.default_mode, None, None),
        Some(Command::Train {
            mode,
            seed,
            sessions,
        }) => train(
            &cli,
            &config,
            mode.unwrap_or(config.default_mode),
            *seed,
            *sessions,
        ),
        Some(Command::Stats) => {
            let stats = StatsStore::load(open_store(&cli, &config)?);
            print!("{}", StatsReport::new(stats.stats()));
            Ok(())
        }
        Some(Command::Clear) => {
            let mut stats = StatsStore::load(open_store(&cli, &config)?);
            stats.clear_stats()?;
            println!("Statistics cleared.");
            Ok(())
        }
        Some(Command::Export { out }) => {
            let stats = StatsStore::load(open_store(&cli, &config)?);
            let rows = match out {
                Some(path) => export_history(stats.stats(), BufWriter::new(File::create(path)?))?,
                None => export_history(stats.stats(), io::stdout().lock())?,
            };
            debug!(rows, "history exported");
            Ok(())
        }
        Some(Command::Sound { setting }) => {
            let mut store = open_store(&cli, &config)?;
            if let Some(setting) = setting {
                sound::save_preference(&mut store, matches!(setting, SoundSetting::On))?;
            }
            let enabled = sound::load_preference(&store);
            println!("Sound is {}.", if enabled { "on" } else { "off" });
            Ok(())
        }
    }
}

fn train(
    cli: &Cli,
    config: &Config,
    mode: TrainingMode,
    seed: Option<u64>,
    sessions: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let store = open_store(cli, config)?;
    let mut sound = SoundSystem::load(&store, || TerminalBell);
    let mut stats = StatsStore::load(store);

    let generator = TargetGenerator::new(GeneratorConfig {
        seed,
        ..GeneratorConfig::from(config)
    });
    let mut trainer = Trainer::new(mode, generator, OfflineGeocoder);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock());
    let summary = console.run(&mut trainer, &mut stats, &mut sound, sessions)?;

    let mut out = console.into_output();
    writeln!(
        out,
        "\n{} session{} recorded.",
        summary.completed,
        if summary.completed == 1 { "" } else { "s" }
    )?;
    Ok(())
}
