//! Bulk staging of questions and attachments to local disk.

use super::{Question, ScoringClient};
use crate::error::{AgentError, Result};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a bulk fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    /// Where the question set was written.
    pub questions_path: PathBuf,
    pub questions: usize,
    /// Questions that reference an attachment.
    pub total_resources: usize,
    pub downloaded: usize,
    /// `(task_id, reason)` for every attachment that could not be saved.
    pub failures: Vec<(String, String)>,
}

/// Download every question to `<data_dir>/questions.json` and every attachment to
/// `<data_dir>/resources/<task_id>/<file_name>`.
pub async fn fetch_all(
    client: &ScoringClient,
    data_dir: &Path,
    concurrency: usize,
    progress: Option<ProgressBar>,
) -> Result<FetchSummary> {
    let raw = client.questions_raw().await?;
    info!("Fetched {} questions", raw.len());

    tokio::fs::create_dir_all(data_dir).await?;
    let questions_path = data_dir.join("questions.json");
    tokio::fs::write(&questions_path, serde_json::to_string_pretty(&raw)?).await?;
    info!("Saved questions to {}", questions_path.display());

    let questions: Vec<Question> = raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<Question>(v) {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("Skipping malformed question: {}", e);
                None
            }
        })
        .collect();

    let with_files: Vec<(String, String)> = questions
        .iter()
        .filter_map(|q| q.file_name.clone().map(|f| (q.task_id.clone(), f)))
        .collect();

    if let Some(pb) = &progress {
        pb.set_length(with_files.len() as u64);
    }

    let resources_dir = data_dir.join("resources");
    let results: Vec<(String, Result<PathBuf>)> = stream::iter(with_files.iter().cloned())
        .map(|(task_id, file_name)| {
            let resources_dir = resources_dir.clone();
            let progress = progress.clone();
            async move {
                let result = download_resource(client, &resources_dir, &task_id, &file_name).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                (task_id, result)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = FetchSummary {
        questions_path,
        questions: questions.len(),
        total_resources: with_files.len(),
        ..Default::default()
    };

    for (task_id, result) in results {
        match result {
            Ok(path) => {
                info!("Downloaded {} for question {}", path.display(), task_id);
                summary.downloaded += 1;
            }
            Err(e) => {
                warn!("Failed to download attachment for question {}: {}", task_id, e);
                summary.failures.push((task_id, e.to_string()));
            }
        }
    }

    summary.failures.sort();
    Ok(summary)
}

async fn download_resource(
    client: &ScoringClient,
    resources_dir: &Path,
    task_id: &str,
    file_name: &str,
) -> Result<PathBuf> {
    // Never let a file name escape its question directory
    let safe_name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| AgentError::Validation(format!("unusable file name {:?}", file_name)))?;
    let safe_task = Path::new(task_id)
        .file_name()
        .ok_or_else(|| AgentError::Validation(format!("unusable task id {:?}", task_id)))?;

    let bytes = client.download_file(task_id).await?;

    let dir = resources_dir.join(safe_task);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(safe_name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Load a staged question set.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AgentError::Validation(format!("cannot read questions file {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::client_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_all_stages_questions_and_files() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "task_id": "t1", "question": "No attachment", "file_name": "" },
                { "task_id": "t2", "question": "Has audio", "file_name": "clip.mp3" },
                { "task_id": "t3", "question": "Broken attachment", "file_name": "gone.png" }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/files/t2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/files/t3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let summary = fetch_all(&client_for(&server), dir.path(), 2, None)
            .await
            .unwrap();

        assert_eq!(summary.questions, 3);
        assert_eq!(summary.total_resources, 2);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "t3");

        let staged = load_questions(&summary.questions_path).unwrap();
        assert_eq!(staged.len(), 3);

        let audio = std::fs::read(dir.path().join("resources").join("t2").join("clip.mp3")).unwrap();
        assert_eq!(audio, b"ID3");
        assert!(!dir.path().join("resources").join("t3").join("gone.png").exists());
    }

    #[tokio::test]
    async fn test_file_name_cannot_escape() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/t9"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let saved = download_resource(
            &client_for(&server),
            &dir.path().join("resources"),
            "t9",
            "../../evil.txt",
        )
        .await
        .unwrap();

        assert_eq!(saved, dir.path().join("resources").join("t9").join("evil.txt"));
    }

    #[test]
    fn test_load_questions_missing_file() {
        let err = load_questions(Path::new("/nonexistent/questions.json")).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }
}
