use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricelens::app::AppContext;
use pricelens::cli::{commands, Cli, Commands};
use pricelens::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Run {
            input,
            csv,
            no_clear,
            headed,
        } => {
            commands::run(&ctx, input.as_deref(), csv.as_deref(), no_clear, headed).await?;
        }
        Commands::List { code } => {
            commands::list_records(&ctx, code.as_deref())?;
        }
        Commands::Export { path } => {
            commands::export(&ctx, &path)?;
        }
    }

    Ok(())
}
