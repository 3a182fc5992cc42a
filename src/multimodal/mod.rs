//! Multimodal request building.
//!
//! Turns a question into the ordered content parts of a model request: the
//! question text, an optional attachment uploaded to the model's file store, and
//! a link reference for every URL found in the text.

mod assembler;
pub mod url;

pub use assembler::{AttachmentUploader, ContentAssembler, FileFetcher};
pub use url::{extract_urls, DetectedUrl, UrlDetector, UrlShape};

use serde::{Deserialize, Serialize};

/// One unit of a multimodal model request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentPart {
    /// The literal question text.
    Text(String),
    /// A file already uploaded to the model's file store.
    RemoteFile {
        uri: String,
        mime_type: Option<String>,
    },
    /// A URL the model should read itself.
    LinkReference(String),
}

impl ContentPart {
    pub fn is_text(&self) -> bool {
        matches!(self, ContentPart::Text(_))
    }

    pub fn is_remote_file(&self) -> bool {
        matches!(self, ContentPart::RemoteFile { .. })
    }
}

/// An attachment as the scoring service names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub task_id: String,
    pub file_name: String,
}

impl FileReference {
    /// Build a reference only when both halves are present and non-empty.
    pub fn from_parts(task_id: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        match (task_id, file_name) {
            (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Some(Self {
                task_id: id.to_string(),
                file_name: name.to_string(),
            }),
            _ => None,
        }
    }

    /// Best-effort MIME type from the file extension.
    pub fn mime_type(&self) -> Option<String> {
        mime_guess::from_path(&self.file_name)
            .first_raw()
            .map(|m| m.to_string())
    }
}
