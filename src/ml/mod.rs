//! Machine Learning Module
//!
//! Everything needed to run a trained load shortfall model in production:
//! - Artifact loading and persistence
//! - Model implementations behind the [`models::MLModel`] trait
//! - The inference service composing preprocessing and prediction
//!
//! Training happens offline; this crate only consumes its output.

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod artifact;
pub mod inference;
pub mod models;

#[cfg(feature = "ml")]
pub mod smartcore;

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
pub enum ModelType {
    LinearRegression,
    Lasso,
    Ridge,
    DecisionTree,
    RandomForest,
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
}

/// Validation Metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.features[i])
    }

    /// Standardize features using z-score normalization.
    ///
    /// A zero-variance feature is scaled by 1, so it becomes `x - mean`.
    pub fn standardize(&self, means: &[f64], stds: &[f64]) -> Result<Self> {
        if means.len() != self.features.len() || stds.len() != self.features.len() {
            anyhow::bail!("Standardization parameter count mismatch");
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(f, (mean, std))| {
                let scale = if std.abs() < 1e-10 { 1.0 } else { *std };
                (f - mean) / scale
            })
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_feature_vector_creation() {
        let fv = FeatureVector::new(vec![1.0, 2.0, 3.0], names(3)).unwrap();
        assert_eq!(fv.len(), 3);
        assert!(!fv.is_empty());
        assert_eq!(fv.get("f2"), Some(2.0));
        assert_eq!(fv.get("f9"), None);
    }

    #[test]
    fn test_feature_vector_count_mismatch() {
        assert!(FeatureVector::new(vec![1.0, 2.0], names(3)).is_err());
    }

    #[test]
    fn test_feature_vector_standardize() {
        let fv = FeatureVector::new(vec![12.0, 20.0, 35.0], names(3)).unwrap();

        let means = vec![10.0, 20.0, 30.0];
        let stds = vec![2.0, 5.0, 0.0];

        let standardized = fv.standardize(&means, &stds).unwrap();
        assert_eq!(standardized.features[0], 1.0); // (12-10)/2
        assert_eq!(standardized.features[1], 0.0); // (20-20)/5
        assert_eq!(standardized.features[2], 5.0); // zero std: 35-30
        assert_eq!(standardized.feature_names, fv.feature_names);

        assert!(fv.standardize(&means[..2], &stds).is_err());
    }

    #[test]
    fn test_model_type_display() {
        assert_eq!(ModelType::RandomForest.to_string(), "RandomForest");
    }
}
