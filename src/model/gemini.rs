//! Gemini REST implementation of the model collaborator.

use super::{FileStore, GenerationConfig, ModelInvoker, ModelRequest, RemoteFileInfo};
use crate::error::{AgentError, Result};
use crate::multimodal::ContentPart;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("gaia-agent/", env!("CARGO_PKG_VERSION"));

/// Files listed per page.
const LIST_PAGE_SIZE: u32 = 100;

/// Upper bound on pages walked while listing files.
const MAX_LIST_PAGES: usize = 50;

/// Gemini API client covering `generateContent` and the Files API.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model` against `endpoint`.
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.endpoint)
    }

    fn files_url(&self) -> String {
        format!("{}/v1beta/files", self.endpoint)
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.endpoint, name.trim_start_matches('/'))
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AgentError::network(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        Err(AgentError::network(url, format!("HTTP {}: {}", status, message)))
    }
}

#[async_trait]
impl ModelInvoker for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, parts = request.parts.len()))]
    async fn generate(&self, request: &ModelRequest) -> Result<String> {
        let url = self.generate_url();
        let body = GenerateContentRequest::from_request(request);

        debug!("Calling generateContent");
        let response = self.send(&url, self.client.post(&url).json(&body)).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("invalid response body: {}", e)))?;

        parsed.answer_text()
    }
}

#[async_trait]
impl FileStore for GeminiClient {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: Option<&str>,
    ) -> Result<RemoteFileInfo> {
        let start_url = self.upload_url();
        let mime = mime_type.unwrap_or("application/octet-stream");

        let start = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }));
        let response = self.send(&start_url, start).await?;

        let session_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AgentError::Upstream("upload start response had no x-goog-upload-url".to_string())
            })?;

        let finalize = self
            .client
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes);
        let response = self.send(&session_url, finalize).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("invalid upload response: {}", e)))?;

        let file: RemoteFileInfo = uploaded.file.into();
        info!("File uploaded: {}, uri: {}", file.name, file.uri);
        Ok(file)
    }

    async fn list(&self) -> Result<Vec<RemoteFileInfo>> {
        let url = self.files_url();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut request = self
                .client
                .get(&url)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListFilesResponse = self
                .send(&url, request)
                .await?
                .json()
                .await
                .map_err(|e| AgentError::Upstream(format!("invalid list response: {}", e)))?;

            files.extend(page.files.into_iter().map(RemoteFileInfo::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(files),
            }
        }

        warn!("Stopped listing files after {} pages", MAX_LIST_PAGES);
        Ok(files)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let url = self.resource_url(name);
        self.send(&url, self.client.delete(&url))
            .await
            .map_err(|e| AgentError::Cleanup(format!("{}: {}", name, e)))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    generation_config: WireGenerationConfig,
}

impl GenerateContentRequest {
    fn from_request(request: &ModelRequest) -> Self {
        let parts = request.parts.iter().map(WirePart::from).collect();

        let system_instruction = if request.system_instruction.is_empty() {
            None
        } else {
            Some(WireContent {
                role: None,
                parts: vec![WirePart::text(&request.system_instruction)],
            })
        };

        Self {
            contents: vec![WireContent {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction,
            tools: request.tools.iter().map(|t| t.to_wire()).collect(),
            generation_config: WireGenerationConfig::from(&request.generation),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<WireFileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl WirePart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn file(uri: &str, mime_type: Option<&str>) -> Self {
        Self {
            file_data: Some(WireFileData {
                mime_type: mime_type.map(|m| m.to_string()),
                file_uri: uri.to_string(),
            }),
            ..Default::default()
        }
    }
}

impl From<&ContentPart> for WirePart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => WirePart::text(text),
            ContentPart::RemoteFile { uri, mime_type } => WirePart::file(uri, mime_type.as_deref()),
            ContentPart::LinkReference(uri) => WirePart::file(uri, None),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    thinking_config: WireThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireThinkingConfig {
    include_thoughts: bool,
    thinking_budget: i32,
}

impl From<&GenerationConfig> for WireGenerationConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            thinking_config: WireThinkingConfig {
                include_thoughts: config.include_thoughts,
                thinking_budget: config.thinking_budget,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the non-thought text parts of the first candidate.
    fn answer_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AgentError::Upstream(format!("prompt blocked: {}", reason)));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            warn!("Model returned no candidates");
            return Ok(String::new());
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            warn!(
                "Model returned no answer text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<WireFile> for RemoteFileInfo {
    fn from(file: WireFile) -> Self {
        Self {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
            display_name: file.display_name,
            state: file.state,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<WireFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
