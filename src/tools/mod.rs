//! Tools available to the agent.
//!
//! The model call itself only carries Gemini's built-in tools. The Wikipedia and
//! calculator tools are standalone helpers exposed through the `tool` command.

pub mod calculator;
pub mod wikipedia;

pub use calculator::calculate;
pub use wikipedia::WikipediaClient;

use serde::{Deserialize, Serialize};

/// Tools the hosted model runs on its own side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTool {
    /// Lets the model fetch and read URLs referenced in the request.
    UrlContext,
    /// Grounds answers with Google Search.
    GoogleSearch,
}

impl BuiltinTool {
    /// JSON form used in a `generateContent` request.
    pub fn to_wire(self) -> serde_json::Value {
        match self {
            BuiltinTool::UrlContext => serde_json::json!({ "urlContext": {} }),
            BuiltinTool::GoogleSearch => serde_json::json!({ "googleSearch": {} }),
        }
    }
}

impl std::fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinTool::UrlContext => write!(f, "url_context"),
            BuiltinTool::GoogleSearch => write!(f, "google_search"),
        }
    }
}

/// The fixed tool list sent with every question.
pub fn fixed_tools() -> Vec<BuiltinTool> {
    vec![BuiltinTool::UrlContext, BuiltinTool::GoogleSearch]
}
