use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use pagepilot_cli::cli::commands::{self, Command};
use pagepilot_cli::cli::runtime;

#[derive(Parser, Debug)]
#[command(
    name = "pagepilot",
    version,
    about = "Goal-directed web automation core",
    long_about = "Validate, inspect, and dry-run stored automation skills. The agent loop \
                  and action executor live in the workspace crates and are driven by an \
                  embedding application; this binary exercises them offline."
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Shortcut for --log-level debug
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    runtime::init_logging(&cli.log_level, cli.debug)?;
    let loaded = runtime::load_config(cli.config.as_ref()).await?;
    if let Some(path) = &loaded.path {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match &cli.command {
        Command::Validate(args) => commands::validate_cmd(args).await,
        Command::Info(args) => commands::info_cmd(args).await,
        Command::Replay(args) => commands::replay_cmd(args, &loaded.config).await,
    }
}
