//! CLI module for gaia-agent.

pub mod commands;
mod output;

pub use output::{mask_secret, Output};

use clap::{Parser, Subcommand};

/// gaia-agent - multimodal question answering with Gemini
///
/// Fetches benchmark questions from the scoring service and answers them with a
/// hosted model that can search the web, read linked pages and inspect attachments.
#[derive(Parser, Debug)]
#[command(name = "gaia-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// The question text
        question: String,

        /// Task id used to download the attachment
        #[arg(short, long, default_value = "adhoc")]
        task_id: String,

        /// Attachment name on the scoring service (requires a real --task-id)
        #[arg(short, long)]
        file_name: Option<String>,

        /// Model to call instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Answer a slice of the staged question set
    Run {
        /// Questions file (defaults to <data_dir>/questions.json)
        #[arg(short, long)]
        questions: Option<String>,

        /// Number of questions to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of questions to answer
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Write submitted answers as JSON to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Download all questions and attachments from the scoring service
    Fetch {
        /// Target directory (defaults to the configured data_dir)
        #[arg(short, long)]
        data_dir: Option<String>,

        /// Parallel attachment downloads
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Run one of the standalone helper tools
    Tool {
        #[command(subcommand)]
        action: ToolAction,
    },

    /// Check configuration and connectivity
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ToolAction {
    /// Search Wikipedia and print page summaries
    Wikipedia {
        /// Search query
        query: String,

        /// Number of pages to summarize
        #[arg(short = 'k', long, default_value = "3")]
        top_k: usize,

        /// Maximum characters per summary
        #[arg(long, default_value = "2000")]
        max_chars: usize,
    },

    /// Evaluate an arithmetic expression
    Calc {
        /// Expression using digits, + - * / . ( ) and spaces
        expression: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}
