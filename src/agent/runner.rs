//! Agent construction and question processing.

use crate::config::{ModelSettings, Prompts, Settings};
use crate::error::Result;
use crate::model::{FileStore, GeminiClient, GenerationConfig, ModelInvoker};
use crate::multimodal::{AttachmentUploader, ContentAssembler, FileFetcher};
use crate::pipeline::{Pipeline, PipelineRun};
use crate::retry::RetryPolicy;
use crate::scoring::{Question, ScoringClient};
use std::sync::Arc;
use tracing::{info, instrument};

impl From<&ModelSettings> for GenerationConfig {
    fn from(settings: &ModelSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            include_thoughts: settings.include_thoughts,
            thinking_budget: settings.thinking_budget,
        }
    }
}

/// Answers questions from the scoring service with a Gemini model.
pub struct Agent {
    settings: Settings,
    pipeline: Pipeline,
}

impl Agent {
    /// Validate `settings` and build every collaborator from them.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        // validate() guarantees the key is present
        let api_key = settings.model.api_key.clone().unwrap_or_default();
        let gemini = Arc::new(GeminiClient::new(
            &settings.model.endpoint,
            &api_key,
            &settings.model.name,
            settings.model_timeout(),
        )?);
        let scoring = ScoringClient::new(&settings.api)?;
        let fetcher: Arc<dyn FileFetcher> =
            Arc::new(AttachmentUploader::new(scoring, gemini.clone()));

        info!("Agent ready with model {}", gemini.model());
        Ok(Self::with_components(
            settings,
            &prompts,
            gemini.clone(),
            Some(gemini as Arc<dyn FileStore>),
            Some(fetcher),
        ))
    }

    /// Build an agent around custom collaborators. Settings are used as given.
    pub fn with_components(
        settings: Settings,
        prompts: &Prompts,
        invoker: Arc<dyn ModelInvoker>,
        files: Option<Arc<dyn FileStore>>,
        fetcher: Option<Arc<dyn FileFetcher>>,
    ) -> Self {
        let assembler = match fetcher {
            Some(fetcher) => ContentAssembler::new(fetcher),
            None => ContentAssembler::text_only(),
        };

        let mut pipeline = Pipeline::new(assembler, invoker, &prompts.system_instruction())
            .with_generation(GenerationConfig::from(&settings.model))
            .with_retry(RetryPolicy::from(&settings.retry))
            .with_recursion_limit(settings.agent.recursion_limit);
        if let Some(files) = files {
            pipeline = pipeline.with_file_store(files);
        }

        Self { settings, pipeline }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Answer one question. Failures come back as `Error: ...`.
    pub async fn answer(&self, question: &Question) -> String {
        self.process_question(question).await.answer
    }

    /// Answer one question and keep the per-stage records.
    #[instrument(skip(self, question), fields(task_id = %question.task_id))]
    pub async fn process_question(&self, question: &Question) -> PipelineRun {
        self.pipeline.run(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::model::ModelRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoInvoker {
        seen: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl ModelInvoker for EchoInvoker {
        async fn generate(&self, request: &ModelRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok("42".to_string())
        }
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let mut settings = Settings::default();
        settings.model.api_key = None;

        match Agent::new(settings) {
            Err(AgentError::Validation(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("agent built without an API key"),
        }
    }

    #[test]
    fn test_oversized_retry_delay_fails_construction() {
        let mut settings: Settings = toml::from_str("[retry]\nmax_delay_secs = 1e20\n").unwrap();
        settings.model.api_key = Some("test-key".to_string());

        assert!(matches!(Agent::new(settings), Err(AgentError::Validation(_))));
    }

    #[test]
    fn test_new_with_key() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("test-key".to_string());
        assert!(Agent::new(settings).is_ok());
    }

    #[tokio::test]
    async fn test_settings_flow_into_requests() {
        let mut settings = Settings::default();
        settings.model.temperature = 0.4;
        settings.model.max_output_tokens = 1024;

        let invoker = Arc::new(EchoInvoker::default());
        let prompts = Prompts::default();
        let agent = Agent::with_components(settings, &prompts, invoker.clone(), None, None);

        let answer = agent.answer(&Question::new("t1", "What is 6 * 7?")).await;
        assert_eq!(answer, "42");

        let seen = invoker.seen.lock().unwrap();
        assert_eq!(seen[0].generation.temperature, 0.4);
        assert_eq!(seen[0].generation.max_output_tokens, 1024);
        assert!(seen[0].generation.include_thoughts);
        assert_eq!(seen[0].system_instruction, prompts.system_instruction());
    }
}
