//! SmartCore ML Model Wrapper
//!
//! Runs random forests fitted with SmartCore. The artifact carries the
//! fitted regressor as bincode bytes; they are decoded once at load time.

use super::{models::MLModel, FeatureVector};
use anyhow::Result;

use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// SmartCore RandomForest Model Wrapper
pub struct SmartcoreRandomForest {
    model: Forest,
    n_features: usize,
}

impl std::fmt::Debug for SmartcoreRandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartcoreRandomForest")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl SmartcoreRandomForest {
    /// Restore a fitted forest from its serialized bytes
    pub fn from_bytes(bytes: &[u8], n_features: usize) -> Result<Self> {
        if n_features == 0 {
            anyhow::bail!("SmartCore forest declares zero input features");
        }
        let model: Forest = bincode::deserialize(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize model: {}", e))?;
        Ok(Self { model, n_features })
    }

    /// Serialize the fitted forest for embedding in an artifact
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.model)
            .map_err(|e| anyhow::anyhow!("Failed to serialize model: {}", e))
    }

    #[cfg(test)]
    pub(crate) fn fit(x: &[Vec<f64>], y: &[f64], n_trees: usize) -> Result<Self> {
        use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;

        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let flat: Vec<f64> = x.iter().flatten().copied().collect();
        let x_matrix = DenseMatrix::new(x.len(), n_features, flat, false);

        let params = RandomForestRegressorParameters {
            max_depth: Some(5),
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees,
            m: None,
            keep_samples: false,
            seed: 42,
        };
        let model = RandomForestRegressor::fit(&x_matrix, &y.to_vec(), params)
            .map_err(|e| anyhow::anyhow!("RandomForest training failed: {:?}", e))?;
        Ok(Self { model, n_features })
    }
}

impl MLModel for SmartcoreRandomForest {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let rows = std::slice::from_ref(features);
        self.predict_batch(rows)?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Model returned empty predictions"))
    }

    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        let mut flat = Vec::with_capacity(rows.len() * self.n_features);
        for row in rows {
            if row.len() != self.n_features {
                anyhow::bail!(
                    "Feature count mismatch: expected {}, got {}",
                    self.n_features,
                    row.len()
                );
            }
            flat.extend_from_slice(&row.features);
        }

        let x = DenseMatrix::new(rows.len(), self.n_features, flat, false);
        let predictions = self
            .model
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;

        if predictions.len() != rows.len() {
            anyhow::bail!(
                "Model returned {} predictions for {} rows",
                predictions.len(),
                rows.len()
            );
        }
        Ok(predictions)
    }

    fn input_dim(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, (i % 4) as f64])
            .collect();
        let y = x.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_bytes_round_trip_predicts_the_same() {
        let (x, y) = training_data();
        let model = SmartcoreRandomForest::fit(&x, &y, 5).unwrap();
        let restored = SmartcoreRandomForest::from_bytes(&model.to_bytes().unwrap(), 2).unwrap();

        let row = FeatureVector::new(vec![7.0, 3.0], vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(model.predict(&row).unwrap(), restored.predict(&row).unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let (x, y) = training_data();
        let model = SmartcoreRandomForest::fit(&x, &y, 3).unwrap();
        let row = FeatureVector::new(vec![1.0], vec!["a".into()]).unwrap();
        assert!(model.predict(&row).is_err());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(SmartcoreRandomForest::from_bytes(&[1, 2, 3], 2).is_err());
        assert!(SmartcoreRandomForest::from_bytes(&[], 0).is_err());
    }
}
