//! Command line interface definitions and helpers.
//!
//! The CLI is defined with the `clap` derive API. `synthesize` runs the full
//! pipeline (read plants, parse the specification, translate, search,
//! extract); `visualize` renders a plant in DOT format.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use syntra_automata::Action;
use syntra_search::heuristics::{
    BfsHeuristic, CompositeHeuristic, DfsHeuristic, Heuristic, NumCanonicalWordsHeuristic,
    PreferEnvironmentActionHeuristic, RandomTiebreakHeuristic, TimeHeuristic,
};

/// syntra - controller synthesis for timed systems against MTL
/// specifications
///
/// Reads a plant as a timed automaton in the UPPAAL XML subset and a metric
/// temporal specification, decides whether the given controller actions
/// suffice to enforce the specification, and writes the synthesized
/// controller back as UPPAAL XML.
#[derive(Parser, Debug)]
#[command(version, name = "syntra", about, long_about)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) log_config: LoggerConfig,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Logging options
#[derive(Args, Debug)]
pub(crate) struct LoggerConfig {
    /// Enable debug output
    #[arg(long, global = true)]
    pub(crate) debug: bool,
    /// Read the logger configuration from a log4rs YAML file
    #[arg(long, global = true, value_name = "LOGGER_CONFIG")]
    pub(crate) logger_config_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Synthesize a controller for a plant against an MTL specification
    Synthesize {
        /// Path to a plant file (UPPAAL XML); may be given multiple times,
        /// the plants are combined into their product
        #[arg(short, long, required = true)]
        plant: Vec<PathBuf>,

        /// The MTL specification, e.g. '(move) D[0,2] (!release)'
        #[arg(short, long)]
        spec: String,

        /// An action owned by the controller; may be given multiple times
        #[arg(short, long = "controller-action", value_name = "ACTION")]
        controller_action: Vec<String>,

        /// An action owned by the environment; defaults to every plant
        /// action that is not controller-owned
        #[arg(short, long = "environment-action", value_name = "ACTION")]
        environment_action: Vec<String>,

        /// A plant location to treat as accepting; defaults to all
        #[arg(short, long = "final-location", value_name = "LOCATION")]
        final_location: Vec<String>,

        /// Actions to synchronize on when combining multiple plants
        #[arg(long = "sync-action", value_name = "ACTION")]
        sync_action: Vec<String>,

        /// Where to write the synthesized controller (UPPAAL XML)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the search tree (DOT)
        #[arg(long, value_name = "DOT_FILE")]
        tree_dot: Option<PathBuf>,

        /// A weighted heuristic component, e.g. 'time=16'; may be given
        /// multiple times
        #[arg(long = "heuristic", value_name = "KIND[=WEIGHT]")]
        heuristic: Vec<String>,

        /// Seed for the random tiebreak heuristic
        #[arg(long)]
        seed: Option<u64>,

        /// Configuration file
        #[arg(long, value_name = "CONFIG_FILE")]
        config_file: Option<PathBuf>,
    },
    /// Render a plant in DOT format
    Visualize {
        /// Path to the plant file (UPPAAL XML)
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the DOT output
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// The failure modes of the CLI, mapped to distinct exit codes
#[derive(Debug)]
pub(crate) enum CliError {
    /// Malformed input (exit code 2)
    Input(anyhow::Error),
    /// A requested feature is not supported (exit code 3)
    Unsupported(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Input(err) => write!(f, "invalid input: {err:#}"),
            CliError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Input(err)
    }
}

/// Initialize the logger from the CLI options
pub(crate) fn initialize_logger(cfg: &LoggerConfig) -> Result<(), anyhow::Error> {
    if let Some(file) = &cfg.logger_config_file {
        log4rs::init_file(file, Default::default())
            .with_context(|| "failed to read the logger config file")?;
        return Ok(());
    }

    let encoder = match cfg.debug {
        true => PatternEncoder::new("{d(%H:%M:%S)} - {h({l})} - [{M}] - {m}{n}"),
        false => PatternEncoder::new("{d(%H:%M:%S)} - {h({l})} - {m}{n}"),
    };
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(encoder))
        .build();
    let level = if cfg.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .with_context(|| "failed to build the logger configuration")?;
    log4rs::init_config(config).with_context(|| "failed to initialize the console logger")?;
    Ok(())
}

/// Build the worklist heuristic from `kind=weight` specifications
///
/// Available kinds: `time`, `prefer-environment`, `num-words`, `random`,
/// `bfs`, `dfs`. The weight defaults to 1; without any specification a
/// composite of `time=16`, `prefer-environment=4` and `random=1` is used.
pub(crate) fn build_heuristic(
    specs: &[String],
    environment_actions: &BTreeSet<Action>,
    seed: u64,
) -> Result<Box<dyn Heuristic>, anyhow::Error> {
    let specs: Vec<String> = if specs.is_empty() {
        vec![
            "time=16".to_string(),
            "prefer-environment=4".to_string(),
            "random=1".to_string(),
        ]
    } else {
        specs.to_vec()
    };
    let mut components: Vec<(i64, Box<dyn Heuristic>)> = Vec::new();
    for spec in &specs {
        let (kind, weight) = match spec.split_once('=') {
            Some((kind, weight)) => (
                kind.trim(),
                weight
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("malformed heuristic weight in '{spec}'"))?,
            ),
            None => (spec.trim(), 1),
        };
        let heuristic: Box<dyn Heuristic> = match kind {
            "time" => Box::new(TimeHeuristic),
            "prefer-environment" => Box::new(PreferEnvironmentActionHeuristic::new(
                environment_actions.clone(),
            )),
            "num-words" => Box::new(NumCanonicalWordsHeuristic),
            "random" => Box::new(RandomTiebreakHeuristic::new(seed)),
            "bfs" => Box::new(BfsHeuristic::default()),
            "dfs" => Box::new(DfsHeuristic::default()),
            _ => return Err(anyhow!("unknown heuristic kind '{kind}'")),
        };
        components.push((weight, heuristic));
    }
    Ok(Box::new(CompositeHeuristic::new(components)))
}
