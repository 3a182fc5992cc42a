//! gaia-agent CLI entry point.

use anyhow::Result;
use clap::Parser;
use gaia_agent::cli::{commands, Cli, Commands, ToolAction};
use gaia_agent::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("gaia_agent={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Ask {
            question,
            task_id,
            file_name,
            model,
        } => {
            commands::run_ask(question, task_id, file_name.as_deref(), model.clone(), settings)
                .await?;
        }

        Commands::Run {
            questions,
            offset,
            limit,
            output,
        } => {
            commands::run_batch(questions.clone(), *offset, *limit, output.clone(), settings)
                .await?;
        }

        Commands::Fetch {
            data_dir,
            concurrency,
        } => {
            commands::run_fetch(data_dir.clone(), *concurrency, settings).await?;
        }

        Commands::Tool { action } => match action {
            ToolAction::Wikipedia {
                query,
                top_k,
                max_chars,
            } => {
                commands::run_wikipedia(query, *top_k, *max_chars).await?;
            }
            ToolAction::Calc { expression } => {
                commands::run_calc(expression);
            }
        },

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
