//! ML Model Inference Engine
//!
//! [`ShortfallService`] is built once at startup and shared read-only by all
//! request handlers. Each request is preprocessed and predicted
//! independently, so a rejected request never affects another.

use super::artifact::{LoadedArtifact, ModelArtifact};
use super::{models::MLModel, FeatureVector, ModelMetadata};
use crate::config::ModelConfig;
use crate::error::{ServingError, ServingResult};
use crate::features::{FeatureSchema, Preprocessor, RecordBatch};
use std::sync::Arc;
use tracing::{debug, info};

/// Run the model over preprocessed rows.
///
/// Returns exactly one finite value per row, in row order.
pub fn invoke(model: &dyn MLModel, rows: &[FeatureVector]) -> ServingResult<Vec<f64>> {
    let predictions = model
        .predict_batch(rows)
        .map_err(|e| ServingError::prediction(format!("{:#}", e)))?;

    if predictions.len() != rows.len() {
        return Err(ServingError::prediction(format!(
            "model returned {} predictions for {} records",
            predictions.len(),
            rows.len()
        )));
    }
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(ServingError::prediction("model produced a non-finite prediction"));
    }
    Ok(predictions)
}

/// Load shortfall prediction service
pub struct ShortfallService {
    metadata: ModelMetadata,
    preprocessor: Preprocessor,
    model: Arc<dyn MLModel>,
}

impl std::fmt::Debug for ShortfallService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortfallService")
            .field("model_id", &self.metadata.model_id)
            .field("schema", &self.preprocessor.schema().version)
            .finish_non_exhaustive()
    }
}

impl ShortfallService {
    /// Load the artifact named by the configuration.
    pub fn from_config(cfg: &ModelConfig) -> ServingResult<Self> {
        let artifact = ModelArtifact::load(&cfg.artifact_path)?;

        if cfg.enforce_builtin_schema && &artifact.schema != FeatureSchema::builtin() {
            return Err(ServingError::corrupt(format!(
                "artifact schema `{}` does not match the built-in `{}` schema",
                artifact.schema.version,
                FeatureSchema::builtin().version
            )));
        }

        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> ServingResult<Self> {
        let LoadedArtifact {
            metadata,
            preprocessor,
            model,
        } = artifact.into_loaded()?;
        Ok(Self::new(metadata, preprocessor, model))
    }

    pub fn new(metadata: ModelMetadata, preprocessor: Preprocessor, model: Arc<dyn MLModel>) -> Self {
        info!(
            model_id = %metadata.model_id,
            model_type = %metadata.model_type,
            input_dim = model.input_dim(),
            "prediction service ready"
        );
        Self {
            metadata,
            preprocessor,
            model,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.preprocessor.schema()
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn input_dim(&self) -> usize {
        self.model.input_dim()
    }

    /// Predict the load shortfall for a single-object JSON payload.
    pub fn make_prediction(&self, payload: &str) -> ServingResult<Vec<f64>> {
        let rows = self.preprocessor.preprocess(payload)?;
        let predictions = invoke(self.model.as_ref(), &rows)?;
        debug!(prediction = ?predictions, "prediction served");
        Ok(predictions)
    }

    /// Predict for a JSON array of records, one value per record.
    pub fn predict_batch(&self, payload: &str) -> ServingResult<Vec<f64>> {
        let batch = RecordBatch::from_batch_payload(payload)?;
        let rows = self.preprocessor.transform_batch(&batch)?;
        let predictions = invoke(self.model.as_ref(), &rows)?;
        debug!(records = predictions.len(), "batch prediction served");
        Ok(predictions)
    }
}
