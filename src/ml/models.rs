//! ML Model Definitions
//!
//! Concrete regressors that can be shipped inside an artifact. Linear, lasso
//! and ridge regression share one representation; tree models use the
//! flattened node layout produced by the training tooling.

use super::FeatureVector;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Trait for ML models
#[cfg_attr(test, mockall::automock)]
pub trait MLModel: Send + Sync {
    /// Predict a value from features
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Predict one value per row, in row order
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.predict(row).with_context(|| format!("row {}", i)))
            .collect()
    }

    /// Number of input features the model was fitted on
    fn input_dim(&self) -> usize;
}

fn check_input(features: &FeatureVector, expected: usize) -> Result<()> {
    if features.len() != expected {
        anyhow::bail!(
            "Feature count mismatch: expected {}, got {}",
            expected,
            features.len()
        );
    }
    if let Some(i) = features.features.iter().position(|f| !f.is_finite()) {
        anyhow::bail!("Feature {} is not finite", i);
    }
    Ok(())
}

fn check_output(value: f64) -> Result<f64> {
    if !value.is_finite() {
        anyhow::bail!("Model produced a non-finite prediction");
    }
    Ok(value)
}

/// Linear model: `intercept + Σ coefficient·feature`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            anyhow::bail!("Linear model has no coefficients");
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("Linear model parameters are not finite");
        }
        Ok(())
    }
}

impl MLModel for LinearRegressionModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_input(features, self.coefficients.len())?;

        let prediction: f64 = features
            .features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept;

        check_output(prediction)
    }

    fn input_dim(&self) -> usize {
        self.coefficients.len()
    }
}

/// Node of a fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TreeNode {
    /// Go `left` when `features[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// Regression tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTreeModel {
    pub n_features: usize,
    pub nodes: Vec<TreeNode>,
}

impl DecisionTreeModel {
    pub fn new(n_features: usize, nodes: Vec<TreeNode>) -> Self {
        Self { n_features, nodes }
    }

    /// Children must come after their parent, which rules out cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("Tree has no nodes");
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.n_features {
                        anyhow::bail!(
                            "Node {} splits on feature {} but the tree has {} features",
                            i,
                            feature,
                            self.n_features
                        );
                    }
                    if !threshold.is_finite() {
                        anyhow::bail!("Node {} has a non-finite threshold", i);
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            anyhow::bail!("Node {} has invalid child index {}", i, child);
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        anyhow::bail!("Leaf {} has a non-finite value", i);
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, features: &[f64]) -> Result<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).ok_or_else(|| {
                        anyhow::anyhow!("Node {} splits on missing feature {}", idx, feature)
                    })?;
                    idx = if *x <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => anyhow::bail!("Tree node {} does not exist", idx),
            }
        }
    }
}

impl MLModel for DecisionTreeModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_input(features, self.n_features)?;
        check_output(self.leaf_value(&features.features)?)
    }

    fn input_dim(&self) -> usize {
        self.n_features
    }
}

/// Random forest: the mean of its trees' predictions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForestModel {
    pub trees: Vec<DecisionTreeModel>,
}

impl RandomForestModel {
    pub fn new(trees: Vec<DecisionTreeModel>) -> Self {
        Self { trees }
    }

    pub fn validate(&self) -> Result<()> {
        let first = self
            .trees
            .first()
            .ok_or_else(|| anyhow::anyhow!("Forest has no trees"))?;

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != first.n_features {
                anyhow::bail!(
                    "Tree {} expects {} features, tree 0 expects {}",
                    i,
                    tree.n_features,
                    first.n_features
                );
            }
            tree.validate().with_context(|| format!("tree {}", i))?;
        }
        Ok(())
    }
}

impl MLModel for RandomForestModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_input(features, self.input_dim())?;
        if self.trees.is_empty() {
            anyhow::bail!("Forest has no trees");
        }

        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.leaf_value(&features.features)?;
        }
        check_output(sum / self.trees.len() as f64)
    }

    fn input_dim(&self) -> usize {
        self.trees.first().map(|t| t.n_features).unwrap_or(0)
    }
}
