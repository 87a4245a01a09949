use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use factcheck::cli::{commands, Cli, Commands};
use factcheck::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = Config::load().map(|c| c.log_level).unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force).await?;
        }
        Commands::Submit { path, document_name } => {
            commands::submit::run(path, document_name).await?;
        }
        Commands::Search { query, top_k } => {
            commands::search::run(query, top_k).await?;
        }
        Commands::Facts {
            document,
            include_rejected,
            output,
            format,
        } => {
            commands::facts::run(document, include_rejected, output, format).await?;
        }
        Commands::Update {
            fact_id,
            statement,
            status,
            reason,
        } => {
            commands::update::run(fact_id, statement, status, reason).await?;
        }
        Commands::Purge { document_name } => {
            commands::purge::run(document_name).await?;
        }
        Commands::Doctor => {
            commands::doctor::run().await?;
        }
    }

    Ok(())
}
