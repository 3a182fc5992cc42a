//! Linear question pipeline: analyze, call the model, clean up.
//!
//! Each stage takes the previous stage's record and returns a new one. The
//! controller never propagates an error to its caller: a failed run still yields
//! an answer string of the form `Error: ...`.

use crate::error::{AgentError, Result};
use crate::model::{FileStore, GenerationConfig, ModelInvoker, ModelRequest};
use crate::multimodal::{extract_urls, ContentAssembler, ContentPart, DetectedUrl};
use crate::retry::{any_error, RetryPolicy};
use crate::scoring::Question;
use crate::tools::{fixed_tools, BuiltinTool};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Assembling,
    Invoking,
    CleaningUp,
    Done,
    Failed,
}

/// Result of the analyze stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeOutput {
    pub detected_urls: Vec<DetectedUrl>,
    pub parts: Vec<ContentPart>,
}

/// Result of the model stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeOutput {
    pub answer: String,
}

/// Result of the cleanup stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupOutput {
    /// Resource names that were deleted.
    pub deleted: Vec<String>,
    /// `(name, reason)` for files that could not be deleted, or for the listing itself.
    pub failed: Vec<(String, String)>,
}

/// Everything a single run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub task_id: String,
    /// The model's answer, or `Error: ...`.
    pub answer: String,
    pub state: PipelineState,
    pub transitions: Vec<PipelineState>,
    pub analysis: Option<AnalyzeOutput>,
    pub invocation: Option<InvokeOutput>,
    pub cleanup: Option<CleanupOutput>,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }
}

/// Sequences assembly, model invocation and cleanup for one question.
pub struct Pipeline {
    assembler: ContentAssembler,
    invoker: Arc<dyn ModelInvoker>,
    files: Option<Arc<dyn FileStore>>,
    system_instruction: String,
    tools: Vec<BuiltinTool>,
    generation: GenerationConfig,
    retry: RetryPolicy,
    recursion_limit: usize,
}

impl Pipeline {
    pub fn new(
        assembler: ContentAssembler,
        invoker: Arc<dyn ModelInvoker>,
        system_instruction: &str,
    ) -> Self {
        Self {
            assembler,
            invoker,
            files: None,
            system_instruction: system_instruction.to_string(),
            tools: fixed_tools(),
            generation: GenerationConfig::default(),
            retry: RetryPolicy::default(),
            recursion_limit: 25,
        }
    }

    /// File store to empty after every run.
    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Answer a question, always returning a string.
    pub async fn answer(&self, question: &Question) -> String {
        self.run(question).await.answer
    }

    /// Run every stage for one question and keep the per-stage records.
    pub async fn run(&self, question: &Question) -> PipelineRun {
        let span = info_span!("process_question", task_id = %question.task_id);
        self.run_inner(question).instrument(span).await
    }

    async fn run_inner(&self, question: &Question) -> PipelineRun {
        let mut run = PipelineRun {
            task_id: question.task_id.clone(),
            answer: String::new(),
            state: PipelineState::Idle,
            transitions: vec![PipelineState::Idle],
            analysis: None,
            invocation: None,
            cleanup: None,
        };
        let mut steps = 0usize;

        let outcome = async {
            self.enter(&mut run, &mut steps, PipelineState::Assembling)?;
            let analysis = self.analyze(question).await;
            run.analysis = Some(analysis.clone());

            self.enter(&mut run, &mut steps, PipelineState::Invoking)?;
            let invocation = self.call_model(&analysis).await?;
            run.invocation = Some(invocation.clone());
            Ok::<_, AgentError>(invocation)
        }
        .await;

        self.transition(&mut run, PipelineState::CleaningUp);
        run.cleanup = Some(self.cleanup_files().await);

        match outcome {
            Ok(invocation) => {
                run.answer = invocation.answer;
                self.transition(&mut run, PipelineState::Done);
                info!("Question answered");
            }
            Err(e) => {
                error!("Question failed: {}", e);
                run.answer = format!("Error: {}", e);
                self.transition(&mut run, PipelineState::Failed);
            }
        }

        run
    }

    fn transition(&self, run: &mut PipelineRun, next: PipelineState) {
        debug!("{:?} -> {:?}", run.state, next);
        run.state = next;
        run.transitions.push(next);
    }

    /// Count one step against the recursion limit, then move to `next`.
    fn enter(&self, run: &mut PipelineRun, steps: &mut usize, next: PipelineState) -> Result<()> {
        *steps += 1;
        if *steps > self.recursion_limit {
            return Err(AgentError::Pipeline(format!(
                "Recursion limit of {} reached without hitting a stop condition",
                self.recursion_limit
            )));
        }
        self.transition(run, next);
        Ok(())
    }

    #[instrument(name = "analyze_input", skip_all)]
    async fn analyze(&self, question: &Question) -> AnalyzeOutput {
        let detected_urls = extract_urls(&question.question);
        if !detected_urls.is_empty() {
            info!("Detected {} URL(s)", detected_urls.len());
        }

        let attachment = question.attachment();
        let parts = self
            .assembler
            .assemble(&question.question, attachment.as_ref(), &detected_urls)
            .await;
        debug!("Assembled {} content part(s)", parts.len());

        AnalyzeOutput {
            detected_urls,
            parts,
        }
    }

    #[instrument(name = "call_model", skip_all)]
    async fn call_model(&self, analysis: &AnalyzeOutput) -> Result<InvokeOutput> {
        let request = ModelRequest {
            parts: analysis.parts.clone(),
            system_instruction: self.system_instruction.clone(),
            tools: self.tools.clone(),
            generation: self.generation.clone(),
        };

        let answer = self
            .retry
            .run(
                |attempt| {
                    debug!(attempt, "Calling model");
                    self.invoker.generate(&request)
                },
                any_error,
            )
            .await
            .map_err(|e| {
                AgentError::Upstream(format!(
                    "gave up after {} attempt(s): {}",
                    e.attempts, e.last
                ))
            })?;

        Ok(InvokeOutput { answer })
    }

    /// Delete every file in the store. Failures are recorded and logged only.
    #[instrument(name = "cleanup_files", skip_all)]
    async fn cleanup_files(&self) -> CleanupOutput {
        let mut output = CleanupOutput::default();
        let Some(files) = &self.files else {
            return output;
        };

        let listed = match files.list().await {
            Ok(listed) => listed,
            Err(e) => {
                warn!("Could not list uploaded files: {}", e);
                output.failed.push(("files".to_string(), e.to_string()));
                return output;
            }
        };

        for file in listed {
            match files.delete(&file.name).await {
                Ok(()) => {
                    debug!("Deleted {}", file.name);
                    output.deleted.push(file.name);
                }
                Err(e) => {
                    warn!("Could not delete {}: {}", file.name, e);
                    output.failed.push((file.name, e.to_string()));
                }
            }
        }

        if !output.deleted.is_empty() {
            info!("Deleted {} uploaded file(s)", output.deleted.len());
        }
        output
    }
}
