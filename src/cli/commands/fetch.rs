//! Fetch command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::scoring::{fetch_all, ScoringClient};
use anyhow::Result;

/// Run the fetch command.
pub async fn run_fetch(data_dir: Option<String>, concurrency: usize, settings: Settings) -> Result<()> {
    let data_dir = data_dir
        .map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.data_dir());

    let client = ScoringClient::new(&settings.api)?;
    Output::info(&format!("Fetching questions from {}", client.questions_url()));

    let pb = Output::progress_bar(0, "attachments");
    let summary = match fetch_all(&client, &data_dir, concurrency, Some(pb.clone())).await {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_and_clear();
            Output::error(&format!("Fetch failed: {}", e));
            return Err(e.into());
        }
    };
    pb.finish_and_clear();

    Output::header("Fetch Summary");
    Output::kv("Questions", &summary.questions.to_string());
    Output::kv("Saved to", &summary.questions_path.display().to_string());
    Output::kv("Attachments", &summary.total_resources.to_string());
    Output::kv("Downloaded", &summary.downloaded.to_string());
    Output::kv("Failed", &summary.failures.len().to_string());

    if summary.failures.is_empty() {
        Output::success("All attachments downloaded.");
    } else {
        println!();
        Output::warning("Some attachments could not be downloaded:");
        for (task_id, reason) in &summary.failures {
            Output::list_item(&format!("{}: {}", task_id, reason));
        }
    }

    Ok(())
}
