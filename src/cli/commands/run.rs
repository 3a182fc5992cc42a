//! Batch answering over the staged question set.

use crate::agent::Agent;
use crate::cli::Output;
use crate::config::Settings;
use crate::scoring::{load_questions, Question, SubmittedAnswer};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the batch command.
pub async fn run_batch(
    questions: Option<String>,
    offset: usize,
    limit: usize,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    let path = questions
        .map(|p| Settings::expand_path(&p))
        .unwrap_or_else(|| settings.questions_path());

    let all = load_questions(&path).with_context(|| {
        format!(
            "Could not load questions from {}. Run 'gaia-agent fetch' first.",
            path.display()
        )
    })?;

    let selected = select(&all, offset, limit);
    if selected.is_empty() {
        Output::warning(&format!(
            "No questions at offset {} ({} available)",
            offset,
            all.len()
        ));
        return Ok(());
    }

    let agent = Agent::new(settings)?;

    Output::info(&format!(
        "Answering {} of {} questions from {}",
        selected.len(),
        all.len(),
        path.display()
    ));

    let pb = Output::progress_bar(selected.len() as u64, "answering");
    let mut answers = Vec::with_capacity(selected.len());
    let mut failed = 0;

    for question in selected {
        pb.set_message(question.task_id.clone());
        let answer = agent.answer(question).await;
        if answer.starts_with("Error:") {
            failed += 1;
        }

        pb.suspend(|| {
            Output::answer_block(
                &question.task_id,
                &question.question,
                question.file_name.as_deref(),
                &answer,
            )
        });
        pb.inc(1);

        answers.push(SubmittedAnswer {
            task_id: question.task_id.clone(),
            submitted_answer: answer,
        });
    }
    pb.finish_and_clear();

    if let Some(output) = output {
        let out_path = PathBuf::from(shellexpand::tilde(&output).to_string());
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out_path, serde_json::to_string_pretty(&answers)?)?;
        Output::success(&format!("Answers written to {}", out_path.display()));
    }

    if failed > 0 {
        Output::warning(&format!("{} of {} questions failed", failed, answers.len()));
    } else {
        Output::success(&format!("Answered {} questions", answers.len()));
    }

    Ok(())
}

fn select(questions: &[Question], offset: usize, limit: usize) -> &[Question] {
    let start = offset.min(questions.len());
    let end = start.saturating_add(limit).min(questions.len());
    &questions[start..end]
}
