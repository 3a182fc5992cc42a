//! Ordered content-part assembly.

use super::{ContentPart, DetectedUrl, FileReference};
use crate::error::Result;
use crate::model::FileStore;
use crate::scoring::ScoringClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Turns a file reference into a part the model can read.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file: &FileReference) -> Result<ContentPart>;
}

/// Downloads attachments from the scoring service and uploads them to the
/// model's file store.
pub struct AttachmentUploader {
    scoring: ScoringClient,
    store: Arc<dyn FileStore>,
}

impl AttachmentUploader {
    pub fn new(scoring: ScoringClient, store: Arc<dyn FileStore>) -> Self {
        Self { scoring, store }
    }
}

#[async_trait]
impl FileFetcher for AttachmentUploader {
    #[instrument(skip(self), fields(task_id = %file.task_id, file_name = %file.file_name))]
    async fn fetch(&self, file: &FileReference) -> Result<ContentPart> {
        let bytes = self.scoring.download_file(&file.task_id).await?;
        debug!("Downloaded {} bytes", bytes.len());

        let mime_type = file.mime_type();
        let uploaded = self
            .store
            .upload(bytes, &file.file_name, mime_type.as_deref())
            .await?;
        info!("Uploaded {} as {}", file.file_name, uploaded.name);

        Ok(ContentPart::RemoteFile {
            uri: uploaded.uri,
            mime_type: uploaded.mime_type.or(mime_type),
        })
    }
}

/// Builds the ordered parts of a model request.
#[derive(Clone, Default)]
pub struct ContentAssembler {
    fetcher: Option<Arc<dyn FileFetcher>>,
}

impl ContentAssembler {
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }

    /// An assembler that cannot materialize attachments.
    pub fn text_only() -> Self {
        Self { fetcher: None }
    }

    /// Emit `Text`, then at most one `RemoteFile`, then one `LinkReference` per URL
    /// in the given order. Attachment failures drop the file part and are logged.
    pub async fn assemble(
        &self,
        text: &str,
        file: Option<&FileReference>,
        urls: &[DetectedUrl],
    ) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(2 + urls.len());
        parts.push(ContentPart::Text(text.to_string()));

        if let Some(file) = file {
            match &self.fetcher {
                Some(fetcher) => match fetcher.fetch(file).await {
                    Ok(part) => parts.push(part),
                    Err(e) => warn!(
                        "Could not attach {} for task {}: {}",
                        file.file_name, file.task_id, e
                    ),
                },
                None => warn!(
                    "No file fetcher configured, skipping attachment {}",
                    file.file_name
                ),
            }
        }

        parts.extend(
            urls.iter()
                .map(|url| ContentPart::LinkReference(url.as_str().to_string())),
        );

        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::model::RemoteFileInfo;
    use crate::multimodal::extract_urls;
    use std::sync::Mutex;

    struct StaticFetcher;

    #[async_trait]
    impl FileFetcher for StaticFetcher {
        async fn fetch(&self, file: &FileReference) -> Result<ContentPart> {
            Ok(ContentPart::RemoteFile {
                uri: format!("https://files.example/{}", file.file_name),
                mime_type: file.mime_type(),
            })
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl FileFetcher for FailingFetcher {
        async fn fetch(&self, file: &FileReference) -> Result<ContentPart> {
            Err(AgentError::network(
                &format!("https://scoring.example/files/{}", file.task_id),
                "connection refused",
            ))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<(String, usize, Option<String>)>>,
    }

    #[async_trait]
    impl FileStore for RecordingStore {
        async fn upload(
            &self,
            bytes: Vec<u8>,
            display_name: &str,
            mime_type: Option<&str>,
        ) -> Result<RemoteFileInfo> {
            self.uploads.lock().unwrap().push((
                display_name.to_string(),
                bytes.len(),
                mime_type.map(str::to_string),
            ));
            Ok(RemoteFileInfo {
                name: "files/abc".to_string(),
                uri: "https://generativelanguage.example/v1beta/files/abc".to_string(),
                mime_type: mime_type.map(str::to_string),
                display_name: Some(display_name.to_string()),
                state: Some("ACTIVE".to_string()),
            })
        }

        async fn list(&self) -> Result<Vec<RemoteFileInfo>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _name: &str) -> Result<()> {
            Ok(())
        }
    }

    fn file(name: &str) -> FileReference {
        FileReference::from_parts(Some("task-1"), Some(name)).unwrap()
    }

    #[tokio::test]
    async fn test_text_then_links() {
        let text = "What is the capital of France? See https://en.wikipedia.org/wiki/France";
        let urls = extract_urls(text);
        let parts = ContentAssembler::text_only().assemble(text, None, &urls).await;

        assert_eq!(
            parts,
            vec![
                ContentPart::Text(text.to_string()),
                ContentPart::LinkReference("https://en.wikipedia.org/wiki/France".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_text_still_yields_text_part() {
        let parts = ContentAssembler::text_only().assemble("", None, &[]).await;
        assert_eq!(parts, vec![ContentPart::Text(String::new())]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_omitted() {
        let assembler = ContentAssembler::new(Arc::new(FailingFetcher));
        let urls = extract_urls("see www.example.com");
        let parts = assembler
            .assemble("see www.example.com", Some(&file("clip.mp3")), &urls)
            .await;

        assert_eq!(
            parts,
            vec![
                ContentPart::Text("see www.example.com".to_string()),
                ContentPart::LinkReference("https://www.example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_file_part_sits_at_index_one() {
        let assembler = ContentAssembler::new(Arc::new(StaticFetcher));
        let text = "Compare https://a.example/x, https://b.example/y and www.c.example";
        let urls = extract_urls(text);
        assert_eq!(urls.len(), 3);

        let parts = assembler.assemble(text, Some(&file("sheet.csv")), &urls).await;

        assert_eq!(parts.len(), 2 + urls.len());
        assert!(parts[0].is_text());
        assert!(parts[1].is_remote_file());
        for (part, url) in parts[2..].iter().zip(&urls) {
            assert_eq!(part, &ContentPart::LinkReference(url.to_string()));
        }
    }

    #[tokio::test]
    async fn test_no_fetcher_skips_attachment() {
        let parts = ContentAssembler::text_only()
            .assemble("q", Some(&file("a.png")), &[])
            .await;
        assert_eq!(parts, vec![ContentPart::Text("q".to_string())]);
    }

    #[tokio::test]
    async fn test_uploader_downloads_then_uploads() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b\n1,2\n".to_vec()))
            .mount(&server)
            .await;

        let store = Arc::new(RecordingStore::default());
        let uploader = AttachmentUploader::new(
            crate::scoring::tests::client_for(&server),
            store.clone(),
        );

        let part = uploader.fetch(&file("sheet.csv")).await.unwrap();
        assert_eq!(
            part,
            ContentPart::RemoteFile {
                uri: "https://generativelanguage.example/v1beta/files/abc".to_string(),
                mime_type: Some("text/csv".to_string()),
            }
        );

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(
            uploads.as_slice(),
            &[("sheet.csv".to_string(), 8, Some("text/csv".to_string()))]
        );
    }
}
