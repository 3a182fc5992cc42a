//! Configuration module for the agent.
//!
//! Handles loading and validating application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    AgentSettings, ApiSettings, GeneralSettings, ModelSettings, PromptSettings, RetrySettings,
    Settings, DEFAULT_API_BASE_URL, DEFAULT_GEMINI_ENDPOINT,
};
