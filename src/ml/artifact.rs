//! Model artifact persistence
//!
//! Artifact layout: the `LSFA` magic, a little-endian `u32` format version,
//! then a bincode-encoded [`ModelArtifact`]. The artifact bundles the fitted
//! model with the feature schema and preprocessing constants frozen at
//! training time, so serving never recomputes them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::models::{DecisionTreeModel, LinearRegressionModel, MLModel, RandomForestModel};
use super::{ModelMetadata, ModelType};
use crate::error::{ServingError, ServingResult};
use crate::features::{FeatureSchema, PreprocessingSpec, Preprocessor};

pub const ARTIFACT_MAGIC: &[u8; 4] = b"LSFA";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// The fitted model carried by an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArtifactModel {
    Linear(LinearRegressionModel),
    DecisionTree(DecisionTreeModel),
    RandomForest(RandomForestModel),
    /// SmartCore random forest, bincode-encoded; needs the `ml` feature
    SmartcoreForest {
        n_features: usize,
        model_bytes: Vec<u8>,
    },
}

impl ArtifactModel {
    fn input_dim(&self) -> usize {
        match self {
            ArtifactModel::Linear(m) => m.input_dim(),
            ArtifactModel::DecisionTree(m) => m.input_dim(),
            ArtifactModel::RandomForest(m) => m.input_dim(),
            ArtifactModel::SmartcoreForest { n_features, .. } => *n_features,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        match self {
            ArtifactModel::Linear(m) => m.validate(),
            ArtifactModel::DecisionTree(m) => m.validate(),
            ArtifactModel::RandomForest(m) => m.validate(),
            ArtifactModel::SmartcoreForest { model_bytes, .. } => {
                if model_bytes.is_empty() {
                    anyhow::bail!("SmartCore forest has no model bytes");
                }
                Ok(())
            }
        }
    }

    fn is_compatible_with(&self, model_type: ModelType) -> bool {
        match self {
            ArtifactModel::Linear(_) => matches!(
                model_type,
                ModelType::LinearRegression | ModelType::Lasso | ModelType::Ridge
            ),
            ArtifactModel::DecisionTree(_) => model_type == ModelType::DecisionTree,
            ArtifactModel::RandomForest(_) | ArtifactModel::SmartcoreForest { .. } => {
                model_type == ModelType::RandomForest
            }
        }
    }

    fn into_predictor(self) -> ServingResult<Arc<dyn MLModel>> {
        match self {
            ArtifactModel::Linear(m) => Ok(Arc::new(m)),
            ArtifactModel::DecisionTree(m) => Ok(Arc::new(m)),
            ArtifactModel::RandomForest(m) => Ok(Arc::new(m)),
            #[cfg(feature = "ml")]
            ArtifactModel::SmartcoreForest {
                n_features,
                model_bytes,
            } => super::smartcore::SmartcoreRandomForest::from_bytes(&model_bytes, n_features)
                .map(|m| Arc::new(m) as Arc<dyn MLModel>)
                .map_err(|e| ServingError::corrupt(format!("{:#}", e))),
            #[cfg(not(feature = "ml"))]
            ArtifactModel::SmartcoreForest { .. } => Err(ServingError::corrupt(
                "artifact holds a SmartCore forest but this build lacks the `ml` feature",
            )),
        }
    }
}

/// Everything the producer ships for one trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub schema: FeatureSchema,
    pub preprocessing: PreprocessingSpec,
    pub model: ArtifactModel,
}

/// An artifact decoded into ready-to-run parts
pub struct LoadedArtifact {
    pub metadata: ModelMetadata,
    pub preprocessor: Preprocessor,
    pub model: Arc<dyn MLModel>,
}

impl std::fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("metadata", &self.metadata)
            .field("preprocessor", &self.preprocessor)
            .field("input_dim", &self.model.input_dim())
            .finish()
    }
}

impl ModelArtifact {
    /// Check the model, schema and constants agree with one another.
    pub fn validate(&self) -> ServingResult<()> {
        self.schema.validate()?;
        self.preprocessing.validate(&self.schema)?;

        self.model
            .validate()
            .map_err(|e| ServingError::corrupt(format!("{:#}", e)))?;

        if self.model.input_dim() != self.schema.len() {
            return Err(ServingError::corrupt(format!(
                "model expects {} features but the schema lists {}",
                self.model.input_dim(),
                self.schema.len()
            )));
        }

        if !self.model.is_compatible_with(self.metadata.model_type) {
            return Err(ServingError::corrupt(format!(
                "metadata declares a {} model that the artifact does not contain",
                self.metadata.model_type
            )));
        }

        let names = &self.metadata.feature_names;
        if !names.is_empty() && !names.iter().map(String::as_str).eq(self.schema.names()) {
            return Err(ServingError::corrupt(
                "metadata feature names disagree with the feature schema",
            ));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> ServingResult<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(ARTIFACT_MAGIC);
        bytes.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> ServingResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ServingError::corrupt(format!(
                "file is {} bytes, shorter than the artifact header",
                bytes.len()
            )));
        }
        if &bytes[..4] != ARTIFACT_MAGIC {
            return Err(ServingError::corrupt("missing LSFA magic"));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != ARTIFACT_FORMAT_VERSION {
            return Err(ServingError::corrupt(format!(
                "unsupported artifact format version {} (expected {})",
                version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let artifact: ModelArtifact = bincode::deserialize(&bytes[HEADER_LEN..])?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact, validating it first.
    pub fn save(&self, path: impl AsRef<Path>) -> ServingResult<()> {
        self.validate()?;
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|e| {
            ServingError::corrupt(format!("failed to write {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), model_id = %self.metadata.model_id, "artifact written");
        Ok(())
    }

    /// Read and validate an artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> ServingResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ServingError::ArtifactNotFound {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        let bytes = std::fs::read(path).map_err(|e| ServingError::ArtifactNotFound {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let artifact = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            model_id = %artifact.metadata.model_id,
            model_type = %artifact.metadata.model_type,
            schema = %artifact.schema.version,
            features = artifact.schema.len(),
            rmse = artifact.metadata.validation_metrics.rmse,
            "model artifact loaded"
        );
        Ok(artifact)
    }

    /// Materialize the predictor and preprocessor.
    pub fn into_loaded(self) -> ServingResult<LoadedArtifact> {
        let preprocessor = Preprocessor::new(Arc::new(self.schema), self.preprocessing)?;
        let model = self.model.into_predictor()?;
        Ok(LoadedArtifact {
            metadata: self.metadata,
            preprocessor,
            model,
        })
    }
}
