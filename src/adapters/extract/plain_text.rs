//! Plain-text extractor for `.txt` and `.md` uploads.
//!
//! Insights are derived structurally: markdown headings and bullet points
//! first, falling back to the leading sentences of the body when a document
//! has no structure to mine.

use async_trait::async_trait;

use crate::config::IngestionConfig;
use crate::ports::{ContentExtractor, ExtractedContent, IngestionError, UploadedFile};

/// At most this many derived insights per document.
const MAX_INSIGHTS: usize = 5;

pub struct PlainTextExtractor {
    config: IngestionConfig,
}

impl PlainTextExtractor {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    fn check_extension(&self, file: &UploadedFile) -> Result<(), IngestionError> {
        let extension = file.extension().unwrap_or_default();
        if !self.config.allowed_extensions.contains(&extension) {
            return Err(IngestionError::UnsupportedType { extension });
        }
        Ok(())
    }

    /// Headings and bullets, else leading sentences.
    fn derive_insights(text: &str) -> Vec<String> {
        let mut insights: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.starts_with('#')
                    || line.starts_with("- ")
                    || line.starts_with("* ")
            })
            .map(|line| {
                line.trim_start_matches(['#', '-', '*', ' '])
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .take(MAX_INSIGHTS)
            .collect();

        if insights.is_empty() {
            insights = text
                .split(['.', '!', '?'])
                .map(str::trim)
                .filter(|s| s.len() > 20)
                .take(3)
                .map(|s| s.to_string())
                .collect();
        }

        insights
    }
}

#[async_trait]
impl ContentExtractor for PlainTextExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedContent, IngestionError> {
        self.check_extension(file)?;

        if file.bytes.len() > self.config.max_file_bytes {
            return Err(IngestionError::ExtractionFailed(format!(
                "file '{}' exceeds the {} byte limit",
                file.name, self.config.max_file_bytes
            )));
        }

        let text = String::from_utf8(file.bytes.clone()).map_err(|_| {
            IngestionError::InvalidEncoding {
                name: file.name.clone(),
            }
        })?;

        if text.trim().is_empty() {
            return Err(IngestionError::EmptyContent {
                name: file.name.clone(),
            });
        }

        let insights = Self::derive_insights(&text);
        Ok(ExtractedContent {
            text: text.trim().to_string(),
            insights,
        })
    }
}
