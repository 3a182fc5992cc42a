//! Standalone helper tools.

use crate::cli::Output;
use crate::tools::{calculate, WikipediaClient};
use anyhow::Result;

/// Search Wikipedia and print the formatted result block.
pub async fn run_wikipedia(query: &str, top_k: usize, max_chars: usize) -> Result<()> {
    let client = WikipediaClient::new()?;

    let spinner = Output::spinner("Searching Wikipedia...");
    let result = client.search_formatted(query, top_k, max_chars).await;
    spinner.finish_and_clear();

    println!("{}", result);
    Ok(())
}

/// Evaluate an arithmetic expression and print the result block.
pub fn run_calc(expression: &str) {
    println!("{}", calculate(expression));
}
