//! Model collaborator abstraction.
//!
//! The pipeline only talks to the hosted model through two traits: one that turns
//! content parts into an answer and one that manages uploaded files.

mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use crate::multimodal::ContentPart;
use crate::tools::BuiltinTool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generation parameters sent with every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub include_thoughts: bool,
    pub thinking_budget: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 4096,
            include_thoughts: true,
            thinking_budget: -1,
        }
    }
}

/// Everything one model call needs.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub parts: Vec<ContentPart>,
    pub system_instruction: String,
    pub tools: Vec<BuiltinTool>,
    pub generation: GenerationConfig,
}

/// A file held by the model's file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileInfo {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
}

/// Produces a text answer from an assembled request.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String>;
}

/// Remote file storage used for attachments.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload bytes and return the stored file.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: Option<&str>,
    ) -> Result<RemoteFileInfo>;

    /// List every file currently stored.
    async fn list(&self) -> Result<Vec<RemoteFileInfo>>;

    /// Delete a file by resource name.
    async fn delete(&self, name: &str) -> Result<()>;
}
