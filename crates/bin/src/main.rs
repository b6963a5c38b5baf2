use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;

use cli::{Cli, Commands};
use config::Config;
use output::OutputFormat;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("canopy=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let config = Config::load(cli.config.as_deref())?.with_overrides(&cli.optimization);
    canopy::notify::set_event_optimization(config.event_optimization);

    match &cli.command {
        Commands::Show(args) => commands::show::run(args, format),
        Commands::Merge(args) => commands::merge::run(args, format),
        Commands::Watch(args) => commands::watch::run(args, format).await,
    }
}
