//! File ingestion limits.

use serde::Deserialize;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// File extensions accepted for upload, lowercase, without the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Upper bound on uploaded file size.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl IngestionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.allowed_extensions.is_empty() {
            return Err(ValidationError::empty_field("ingestion.allowed_extensions"));
        }
        if self.max_file_bytes == 0 {
            return Err(ValidationError::out_of_range(
                "ingestion.max_file_bytes",
                1,
                i32::MAX,
                0,
            ));
        }
        Ok(())
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["txt".to_string(), "md".to_string()]
}

fn default_max_file_bytes() -> usize {
    1024 * 1024
}
