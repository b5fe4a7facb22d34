//! syntra command line driver.
//!
//! Runs the synthesis pipeline: read the plant(s), parse the MTL
//! specification, translate it into an ATA over the plant alphabet, search
//! for a winning controller strategy and write the controller. The exit
//! code reports the outcome: 0 if a controller exists, 1 if none exists,
//! 2 on malformed input, 3 on unsupported configurations.

use std::collections::BTreeSet;
use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use human_panic::setup_panic;
use log::{debug, info};

use syntra_automata::ta::product::{product, ProductError};
use syntra_automata::ta::TimedAutomaton;
use syntra_automata::{Action, Location};
use syntra_io::{parse_mtl, search_tree_to_dot, ta_from_xml, ta_to_dot, ta_to_xml};
use syntra_logic::translator::translate;
use syntra_search::controller::create_controller;
use syntra_search::{NodeLabel, TreeSearch};

use crate::cli::{build_heuristic, initialize_logger, Cli, CliError, Commands};
use crate::syntra_config::SyntraConfig;

mod cli;
mod syntra_config;

fn main() -> ExitCode {
    setup_panic!();
    let cli = Cli::parse();
    if let Err(err) = initialize_logger(&cli.log_config) {
        eprintln!("failed to initialize the logger: {err:#}");
        return ExitCode::from(2);
    }
    match run(cli) {
        Ok(NodeLabel::Top) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err @ CliError::Input(_)) => {
            log::error!("{err}");
            ExitCode::from(2)
        }
        Err(err @ CliError::Unsupported(_)) => {
            log::error!("{err}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<NodeLabel, CliError> {
    match cli.command {
        Commands::Visualize { input, output } => {
            let content = fs::read_to_string(&input)
                .with_context(|| format!("could not read '{}'", input.display()))
                .map_err(CliError::Input)?;
            let ta = ta_from_xml(&content, &BTreeSet::new()).map_err(CliError::Input)?;
            fs::write(&output, ta_to_dot(&ta, "plant"))
                .with_context(|| format!("could not write '{}'", output.display()))
                .map_err(CliError::Input)?;
            info!("Wrote the plant graph to '{}'", output.display());
            // Visualization has no synthesis outcome; report success.
            Ok(NodeLabel::Top)
        }
        Commands::Synthesize {
            plant,
            spec,
            controller_action,
            environment_action,
            final_location,
            sync_action,
            output,
            tree_dot,
            heuristic,
            seed,
            config_file,
        } => {
            // Load file and environment configuration; CLI flags win.
            let mut settings = config::Config::builder();
            if let Some(config_file) = &config_file {
                if !config_file.exists() {
                    return Err(CliError::Input(anyhow::anyhow!(
                        "the configuration file '{}' does not exist",
                        config_file.display()
                    )));
                }
                settings = settings.add_source(config::File::from(config_file.clone()));
            }
            settings = settings.add_source(config::Environment::with_prefix("SYNTRA"));
            let file_config: SyntraConfig = settings
                .build()
                .and_then(|settings| settings.try_deserialize())
                .with_context(|| "failed to load the configuration")
                .map_err(CliError::Input)?;

            let finals: BTreeSet<Location> =
                final_location.iter().map(Location::new).collect();
            let mut plants = Vec::new();
            for path in &plant {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("could not read '{}'", path.display()))
                    .map_err(CliError::Input)?;
                plants.push(ta_from_xml(&content, &finals).map_err(CliError::Input)?);
            }
            let synchronized: BTreeSet<Action> = sync_action.iter().map(Action::new).collect();
            let plant: TimedAutomaton = if plants.len() == 1 && synchronized.is_empty() {
                plants.remove(0)
            } else {
                product(&plants, &synchronized).map_err(|err| match err {
                    ProductError::SynchronizedActions(_) => CliError::Unsupported(err.to_string()),
                    other => CliError::Input(anyhow::anyhow!(other)),
                })?
            };
            info!(
                "Read a plant with {} locations and {} transitions",
                plant.locations().len(),
                plant.transitions().count()
            );
            debug!("Plant:\n{plant}");

            let spec = parse_mtl(&spec).map_err(CliError::Input)?;
            info!("Specification: {spec}");
            let ata = translate(&spec, plant.alphabet().iter().cloned())
                .map_err(|err| CliError::Input(anyhow::anyhow!(err)))?;
            debug!("ATA:\n{ata}");

            let controller_actions: BTreeSet<Action> =
                controller_action.iter().map(Action::new).collect();
            let environment_actions: BTreeSet<Action> = if environment_action.is_empty() {
                plant
                    .alphabet()
                    .difference(&controller_actions)
                    .cloned()
                    .collect()
            } else {
                environment_action.iter().map(Action::new).collect()
            };
            info!(
                "Controller actions: {}",
                syntra_display_utils::join_iterator(controller_actions.iter(), ", ")
            );
            info!(
                "Environment actions: {}",
                syntra_display_utils::join_iterator(environment_actions.iter(), ", ")
            );

            let k = plant.largest_constant().max(spec.largest_constant());
            info!("Largest constant: {k}");
            let seed = seed.or(file_config.seed).unwrap_or(0);
            let heuristic_specs = if heuristic.is_empty() {
                file_config.heuristics.clone()
            } else {
                heuristic
            };
            let heuristic = build_heuristic(&heuristic_specs, &environment_actions, seed)
                .map_err(CliError::Input)?;

            info!("Initializing the search");
            let mut search = TreeSearch::new(
                &plant,
                &ata,
                controller_actions,
                environment_actions,
                k,
                heuristic,
            )
            .map_err(|err| CliError::Input(anyhow::anyhow!(err)))?;
            info!("Running the search");
            search
                .build_tree()
                .map_err(|err| CliError::Input(anyhow::anyhow!(err)))?;
            search.label();
            info!(
                "Search finished: {} nodes, {} distinct canonical words, root label {}",
                search.tree().len(),
                search.distinct_word_count(),
                search.root_label()
            );

            if let Some(tree_dot) = &tree_dot {
                fs::write(tree_dot, search_tree_to_dot(search.tree()))
                    .with_context(|| format!("could not write '{}'", tree_dot.display()))
                    .map_err(CliError::Input)?;
                info!("Wrote the search tree to '{}'", tree_dot.display());
            }

            let label = search.root_label();
            if label == NodeLabel::Top {
                info!("A controller exists");
                let controller = create_controller(search.tree(), k)
                    .map_err(|err| CliError::Input(anyhow::anyhow!(err)))?;
                info!(
                    "Synthesized a controller with {} locations",
                    controller.locations().len()
                );
                if let Some(output) = &output {
                    fs::write(output, ta_to_xml(&controller, "controller"))
                        .with_context(|| format!("could not write '{}'", output.display()))
                        .map_err(CliError::Input)?;
                    info!("Wrote the controller to '{}'", output.display());
                }
            } else {
                info!("No controller exists (root label: {label})");
            }
            Ok(label)
        }
    }
}
