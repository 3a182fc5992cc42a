//! Client for the scoring service that hands out questions and attachments.
//!
//! The service is consumed read-only: `GET /questions` returns the question set and
//! `GET /files/{task_id}` returns the raw bytes of a question's attachment.

mod fetch;

pub use fetch::{fetch_all, load_questions, FetchSummary};

use crate::config::ApiSettings;
use crate::error::{AgentError, Result};
use crate::multimodal::FileReference;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// User-Agent string for scoring service requests.
const USER_AGENT: &str = concat!("gaia-agent/", env!("CARGO_PKG_VERSION"));

/// One question from the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub task_id: String,
    #[serde(default)]
    pub question: String,
    /// Attachment name; empty strings are treated as no attachment.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Question {
    pub fn new(task_id: &str, question: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            question: question.to_string(),
            file_name: None,
        }
    }

    pub fn with_file(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string()).filter(|f| !f.is_empty());
        self
    }

    /// The attachment to materialize, if any.
    pub fn attachment(&self) -> Option<FileReference> {
        FileReference::from_parts(Some(&self.task_id), self.file_name.as_deref())
    }
}

/// An answer in the shape the scoring service accepts for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub task_id: String,
    pub submitted_answer: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// HTTP client for the scoring service.
#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
    base_url: String,
    questions_timeout: Duration,
    files_timeout: Duration,
}

impl ScoringClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            questions_timeout: Duration::from_secs(settings.questions_timeout_secs),
            files_timeout: Duration::from_secs(settings.files_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn questions_url(&self) -> String {
        format!("{}/questions", self.base_url)
    }

    pub fn file_url(&self, task_id: &str) -> String {
        format!("{}/files/{}", self.base_url, task_id)
    }

    /// Fetch the question set exactly as the service returns it.
    #[instrument(skip(self))]
    pub async fn questions_raw(&self) -> Result<Vec<serde_json::Value>> {
        let url = self.questions_url();
        let response = self.get(&url, self.questions_timeout).await?;
        response
            .json()
            .await
            .map_err(|e| AgentError::network(&url, format!("invalid JSON: {}", e)))
    }

    /// Fetch and parse the question set.
    pub async fn questions(&self) -> Result<Vec<Question>> {
        self.questions_raw()
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(AgentError::from))
            .collect()
    }

    /// Download the attachment of a question.
    #[instrument(skip(self))]
    pub async fn download_file(&self, task_id: &str) -> Result<Vec<u8>> {
        let url = self.file_url(task_id);
        debug!("Downloading file from: {}", url);
        let response = self.get(&url, self.files_timeout).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AgentError::network(&url, format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AgentError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::network(url, format!("HTTP {}", status)));
        }

        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> ScoringClient {
        ScoringClient::new(&ApiSettings {
            base_url: format!("{}/", server.uri()),
            ..ApiSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_question_parsing() {
        let q: Question = serde_json::from_value(serde_json::json!({
            "task_id": "abc",
            "question": "What is 2+2?",
            "Level": "1",
            "file_name": ""
        }))
        .unwrap();
        assert_eq!(q.task_id, "abc");
        assert_eq!(q.file_name, None);
        assert!(q.attachment().is_none());

        let q: Question = serde_json::from_value(serde_json::json!({
            "task_id": "def",
            "question": "Review the chess position.",
            "file_name": "board.png"
        }))
        .unwrap();
        let file = q.attachment().unwrap();
        assert_eq!(file.task_id, "def");
        assert_eq!(file.file_name, "board.png");
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = ScoringClient::new(&ApiSettings {
            base_url: "https://scoring.example/".to_string(),
            ..ApiSettings::default()
        })
        .unwrap();
        assert_eq!(client.questions_url(), "https://scoring.example/questions");
        assert_eq!(client.file_url("t1"), "https://scoring.example/files/t1");
    }

    #[tokio::test]
    async fn test_questions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "task_id": "t1", "question": "Q1", "file_name": "" },
                { "task_id": "t2", "question": "Q2", "file_name": "data.xlsx" }
            ])))
            .mount(&server)
            .await;

        let questions = client_for(&server).questions().await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].file_name.as_deref(), Some("data.xlsx"));
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/t2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xde, 0xad]))
            .mount(&server)
            .await;

        let bytes = client_for(&server).download_file("t2").await.unwrap();
        assert_eq!(bytes, vec![0xde, 0xad]);
    }

    #[tokio::test]
    async fn test_download_missing_file_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).download_file("nope").await.unwrap_err();
        assert!(matches!(err, AgentError::Network(_)));
        assert!(err.to_string().contains("404"));
    }
}
