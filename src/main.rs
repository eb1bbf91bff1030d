mod config;
mod dedup;
mod filter;
mod models;
mod normalize;
mod pipeline;
mod scheduler;
mod scrapers;
mod server;
mod store;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use pipeline::JobRunner;
use scheduler::RunSchedule;
use server::AppState;

/// Scrape internship postings and track new ones.
#[derive(Parser, Debug)]
#[command(name = "jobbot", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "JOBBOT_CONFIG", default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the scheduler and the HTTP server (default)
    Serve,
    /// Run one pass and print the summary as JSON
    Run,
}

fn init_logging() {
    // RUST_LOG wins; LOG_LEVEL is the simpler knob.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    init_logging();

    let cli = Cli::parse();

    info!("💼 Job Bot");
    info!("==========================================");

    let config = Arc::new(Config::load(&cli.config));
    let store = store::from_config(&config)?;
    let scrapers = scrapers::build_all(&config)?;
    let runner = Arc::new(JobRunner::new(config.clone(), scrapers, store));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Run => {
            let summary = runner.run().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Serve => {
            match RunSchedule::from_config(&config.scheduler) {
                Ok(schedule) => {
                    tokio::spawn(scheduler::run_scheduler(runner.clone(), schedule));
                }
                Err(e) => error!("❌ Scheduler disabled: {:#}", e),
            }
            server::serve(Arc::new(AppState { runner }), &config.server.bind).await?;
        }
    }

    Ok(())
}
