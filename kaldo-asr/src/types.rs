//! Core types for kaldo-asr

use crate::error::{DecodeWarning, ModelError};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One recognized word with its time span.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub word: String,
    /// Start time in seconds from the start of the stream
    pub start: f32,
    /// End time in seconds from the start of the stream
    pub end: f32,
    /// Posterior confidence in `[0, 1]`
    pub conf: f32,
}

/// Finalized utterance.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UtteranceResult {
    pub result: Vec<WordResult>,
    /// Words joined by single spaces
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<DecodeWarning>,
}

impl UtteranceResult {
    pub fn new(result: Vec<WordResult>) -> Self {
        let text = result
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            result,
            text,
            warning: None,
        }
    }

    /// Empty result carrying a warning.
    pub fn empty(warning: DecodeWarning) -> Self {
        Self {
            warning: Some(warning),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Serialize as a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Words on the current best path of an unfinished utterance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub partial: String,
}

impl PartialResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a required file to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf, ModelError> {
        match self {
            ModelRepo::Path(path) => {
                let full = path.join(file_name);
                if full.is_file() {
                    Ok(full)
                } else {
                    Err(ModelError::MissingFile(full.display().to_string()))
                }
            }
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_else(|| ModelError::MissingFile(format!("{file_name} (cache)"))),
            ModelRepo::Api(api_repo) => Ok(api_repo.get(file_name)?),
        }
    }

    /// Resolve an optional file; absence is not an error.
    pub fn locate(&self, file_name: &str) -> Option<PathBuf> {
        match self {
            ModelRepo::Path(path) => Some(path.join(file_name)).filter(|p| p.is_file()),
            ModelRepo::Cache(cache_repo) => cache_repo.get(file_name),
            ModelRepo::Api(api_repo) => match api_repo.get(file_name) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::debug!(file_name, error = %e, "optional file not available");
                    None
                }
            },
        }
    }

    /// Human-readable location for error messages.
    pub fn location(&self) -> String {
        match self {
            ModelRepo::Path(path) => path.display().to_string(),
            ModelRepo::Cache(cache_repo) => format!("{cache_repo:?}"),
            ModelRepo::Api(api_repo) => format!("{api_repo:?}"),
        }
    }
}
