//! Configuration types for resolved CLI arguments.
//!
//! This module contains Config structs and their TryFrom implementations.
//! Args structs (for CLI parsing) remain in cli.rs.

use crate::cli::{ModelArgs, ModelSource};
use eyre::Result;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use kaldo_asr::types::ModelRepo;
use std::path::PathBuf;

/// Resolved model location.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct RepoConfig {
    pub repo: ModelRepo,
}

impl TryFrom<ModelArgs> for RepoConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model_id);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    tracing::debug!(model_id = %args.model_id, "not a local directory, using hub");
                    ModelRepo::Api(Api::new()?.model(args.model_id))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(args.model_id)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model_id)),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model_id)),
        };

        Ok(Self { repo })
    }
}
