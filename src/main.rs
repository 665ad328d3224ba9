use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postlink::app::AppContext;
use postlink::cli::{commands, finish, Cli, Commands};
use postlink::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    ExitCode::from(finish(run(Cli::parse()).await))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Ingest => commands::ingest(&ctx).await?,
        Commands::Map => commands::map(&ctx).await?,
        Commands::Posts { unmapped } => commands::list_posts(&ctx, unmapped)?,
    }

    Ok(())
}
