//! Session persistence and retention settings.

use serde::Deserialize;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Maximum transcript length before the oldest messages are dropped.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Age after which an untouched session is eligible for eviction.
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: i64,

    /// Directory session records are written to.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_cap == 0 {
            return Err(ValidationError::out_of_range(
                "session.history_cap",
                1,
                i32::MAX,
                0,
            ));
        }
        if self.staleness_hours <= 0 {
            return Err(ValidationError::out_of_range(
                "session.staleness_hours",
                1,
                i32::MAX,
                self.staleness_hours as i32,
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            staleness_hours: default_staleness_hours(),
            storage_dir: default_storage_dir(),
        }
    }
}

fn default_history_cap() -> usize {
    100
}

fn default_staleness_hours() -> i64 {
    24
}

fn default_storage_dir() -> String {
    "data/sessions".to_string()
}
