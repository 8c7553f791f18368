//! Ingestion Port - file content extraction.
//!
//! File-format parsing is opaque to the core: an uploaded file goes in,
//! plain text and derived insights come out. Failure is fatal to the current
//! turn only and never reaches the refinement engine.

use async_trait::async_trait;

/// An uploaded file as received from the caller's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Original file name, extension included.
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
    }
}

/// Text and insights extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub insights: Vec<String>,
}

/// Failure extracting content from an uploaded file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestionError {
    #[error("unsupported file type: {extension}")]
    UnsupportedType { extension: String },

    #[error("file '{name}' contains no extractable text")]
    EmptyContent { name: String },

    #[error("file '{name}' is not valid UTF-8")]
    InvalidEncoding { name: String },

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Port for file content extraction.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extracts text and insights from an uploaded file.
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedContent, IngestionError>;
}
