use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub mod model;
pub mod rule_based;
pub mod trained;

use model::ForecastModel;
use rule_based::RuleBasedModel;
use trained::{ForestParams, LinearParams, Regressor, TrainedModel};

#[derive(Debug, Deserialize)]
pub struct ArtifactFile {
    pub model: String,
    pub params: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

// Model Factory
pub fn create_model(
    model_type: &str,
    artifact: &ArtifactFile,
) -> Result<TrainedModel, ArtifactError> {
    let regressor = match artifact.model.as_str() {
        "linear" => {
            let params: LinearParams = serde_json::from_value(artifact.params.clone())?;
            Regressor::linear(params)?
        }
        "random_forest" => {
            let params: ForestParams = serde_json::from_value(artifact.params.clone())?;
            Regressor::random_forest(params)?
        }
        other => return Err(ArtifactError::Invalid(format!("unknown model: {other}"))),
    };
    Ok(TrainedModel::new(model_type, regressor))
}

pub fn load_artifact_from_path(
    model_type: &str,
    path: impl AsRef<Path>,
) -> Result<TrainedModel, ArtifactError> {
    let contents = std::fs::read_to_string(path)?;
    let artifact: ArtifactFile = serde_json::from_str(&contents)?;
    create_model(model_type, &artifact)
}

/// Picks the first candidate artifact that loads, else the rule-based model.
///
/// Never fails: unreadable or corrupt artifacts are logged and skipped.
pub fn select_model(candidates: &[(&str, PathBuf)]) -> Arc<dyn ForecastModel> {
    for (model_type, path) in candidates {
        if !path.is_file() {
            info!(model_type, path = %path.display(), "Model artifact not found");
            continue;
        }
        match load_artifact_from_path(model_type, path) {
            Ok(model) => {
                info!(model_type, path = %path.display(), "Trained model loaded");
                return Arc::new(model);
            }
            Err(err) => {
                warn!(model_type, path = %path.display(), error = %err, "Failed to load model artifact");
            }
        }
    }
    info!("No trained model available, using rule-based predictor");
    Arc::new(RuleBasedModel)
}
