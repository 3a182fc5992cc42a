//! Ask command implementation.

use crate::agent::Agent;
use crate::cli::Output;
use crate::config::Settings;
use crate::scoring::Question;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    task_id: &str,
    file_name: Option<&str>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(model) = model {
        settings.model.name = model;
    }

    let agent = match Agent::new(settings) {
        Ok(agent) => agent,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'gaia-agent doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let mut question = Question::new(task_id, question);
    if let Some(name) = file_name {
        question = question.with_file(name);
    }

    let spinner = Output::spinner("Thinking...");
    let answer = agent.answer(&question).await;
    spinner.finish_and_clear();

    if answer.starts_with("Error:") {
        Output::error(&answer);
        anyhow::bail!("failed to answer question {}", question.task_id);
    }

    println!("\n{}\n", answer);
    Ok(())
}
