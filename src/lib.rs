//! gaia-agent - a multimodal question-answering agent
//!
//! Answers benchmark questions from a scoring service with a hosted Gemini model.
//!
//! # Overview
//!
//! For every question the agent:
//! - detects URLs embedded in the question text
//! - downloads the question's attachment, if any, and uploads it to the model's file store
//! - sends text, attachment and links to the model with its built-in search and URL tools
//! - deletes uploaded files again, whatever the outcome
//!
//! # Architecture
//!
//! - `config` - Settings and prompts
//! - `multimodal` - URL detection and content assembly
//! - `model` - Model collaborator traits and the Gemini client
//! - `retry` - Bounded exponential backoff
//! - `pipeline` - Analyze, call model, clean up
//! - `agent` - Construction from validated settings
//! - `scoring` - Scoring service client and bulk fetch
//! - `tools` - Built-in model tools plus Wikipedia and calculator helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use gaia_agent::agent::Agent;
//! use gaia_agent::config::Settings;
//! use gaia_agent::scoring::Question;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent = Agent::new(Settings::load()?)?;
//!
//!     let question = Question::new("demo", "What is the capital of France?");
//!     println!("{}", agent.answer(&question).await);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod multimodal;
pub mod pipeline;
pub mod retry;
pub mod scoring;
pub mod tools;

pub use error::{AgentError, Result};
