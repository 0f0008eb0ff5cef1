//! varactions daemon.
//!
//! Usage: `varactions [-v] [-o] [-h] [<filename>]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use tracing::{error, info};

use varactions::{
    install_termination_handler, load, notification_channel, BasicRunner, Engine, EngineConfig,
    InMemoryVariableStore, TerminationContext, ThreadTimerBackend, TimerManager, VariableStore,
};

#[derive(Parser)]
#[command(
    name = "varactions",
    about = "Run actions when variables change, calculations are requested or timers fire",
    version,
    disable_help_flag = true
)]
struct Cli {
    /// Report every notification and its result
    #[arg(short = 'v', action = ArgAction::SetTrue)]
    verbose: bool,

    /// Print documentation of the loaded definition
    #[arg(short = 'o', action = ArgAction::SetTrue)]
    output: bool,

    /// Print usage and continue
    #[arg(short = 'h', action = ArgAction::SetTrue)]
    help: bool,

    /// Trigger definition file
    filename: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_target(false)
        .init();

    if cli.help {
        eprintln!("{}", Cli::command().render_usage());
    }

    let config = EngineConfig {
        verbose: cli.verbose,
        output: cli.output,
        definition: cli.filename,
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(config: &EngineConfig) -> anyhow::Result<()> {
    let (notifier, notifications) = notification_channel();
    let store = Arc::new(InMemoryVariableStore::open(notifier.clone()));
    let mut timers = TimerManager::new(ThreadTimerBackend::start(notifier.clone())?);

    let registry = load(config, store.as_ref(), &mut timers).context("loading trigger definition")?;
    info!(
        triggers = registry.len(),
        timers = timers.len(),
        name = registry.name().unwrap_or("-"),
        "definition loaded"
    );
    if config.output {
        print!("{}", registry.describe());
        print!("{}", timers.describe());
    }

    let store: Arc<dyn VariableStore> = store;
    install_termination_handler(TerminationContext::new(
        Arc::clone(&store),
        config.definition.clone(),
    ))?;

    let mut engine = Engine::new(registry, store, Box::new(BasicRunner::new()));
    engine.run(&notifications)?;

    // Producers stay alive for the lifetime of the loop.
    drop(timers);
    drop(notifier);
    Ok(())
}
