mod cli;
mod config;
mod error;
mod events;
mod orchestrator;
mod protocol;
mod server;
mod session;
mod state_machine;
mod trial;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::BoxflowConfig;
use events::{Event, EventSink, Status};
use orchestrator::WorkflowController;
use session::WorkflowSettings;
use trial::{RandomSampler, TrialGenerator};
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = BoxflowConfig::load()?;
    if let Some(latency_ms) = cli.latency_ms {
        config.trial_latency_ms = latency_ms;
    }

    // The demo draws on the terminal, so keep logs quiet there unless asked.
    let default_filter = match (&cli.command, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Command::Demo { .. }, false) => "warn".to_string(),
        (Command::Serve { .. }, false) => config.log_filter.clone(),
    };
    init_tracing(&default_filter);

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let settings = WorkflowSettings::random(config.trial_latency());
            server::serve(config.socket_addr()?, settings).await
        }
        Command::Demo { seed } => {
            let sampler = match seed {
                Some(seed) => RandomSampler::seeded(seed),
                None => RandomSampler::from_entropy(),
            };
            let progress = RunProgress::start();
            progress.emit(Event::Status(Status::Running))?;
            let trials = TrialGenerator::new(sampler, config.trial_latency());
            let report = WorkflowController::new(&progress, trials).run().await?;
            progress.complete(report.outcome);
            progress.print_report(&report);
            Ok(())
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
