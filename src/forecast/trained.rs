//! Pre-fitted regression artifacts exported as JSON.
//!
//! Two artifact kinds are understood: an ordinary linear regression and a
//! random forest (mean of decision trees). Both consume the fixed feature
//! vector from [`ForecastInput::features`].

use crate::forecast::ArtifactError;
use crate::forecast::model::{ForecastInput, ForecastModel};
use serde::Deserialize;

const FEATURES: usize = ForecastInput::FEATURE_COUNT;

#[derive(Debug, Clone, Deserialize)]
pub struct LinearParams {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearParams {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.coefficients.len() != FEATURES {
            return Err(ArtifactError::Invalid(format!(
                "linear model needs {FEATURES} coefficients, found {}",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::Invalid(
                "linear model contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    fn predict(&self, features: &[f64; FEATURES]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point forward so evaluation always reaches a leaf.
    fn validate(&self, tree_index: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid(format!("tree {tree_index} has no nodes")));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURES {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {tree_index} node {index}: feature {feature} out of range"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {tree_index} node {index}: non-finite threshold"
                        )));
                    }
                    for child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(ArtifactError::Invalid(format!(
                                "tree {tree_index} node {index}: bad child index {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {tree_index} node {index}: non-finite leaf"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64; FEATURES]) -> f64 {
        let mut index = 0;
        while let Some(node) = self.nodes.get(index) {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
        0.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestParams {
    pub trees: Vec<DecisionTree>,
}

impl ForestParams {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("forest has no trees".to_string()));
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, tree)| tree.validate(i))
    }

    fn predict(&self, features: &[f64; FEATURES]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }
}

#[derive(Debug, Clone)]
pub enum Regressor {
    Linear(LinearParams),
    RandomForest(ForestParams),
}

impl Regressor {
    pub fn linear(params: LinearParams) -> Result<Self, ArtifactError> {
        params.validate()?;
        Ok(Self::Linear(params))
    }

    pub fn random_forest(params: ForestParams) -> Result<Self, ArtifactError> {
        params.validate()?;
        Ok(Self::RandomForest(params))
    }
}

/// A validated trained artifact plus the tag it was loaded under.
#[derive(Debug)]
pub struct TrainedModel {
    model_type: String,
    regressor: Regressor,
}

impl TrainedModel {
    pub fn new(model_type: impl Into<String>, regressor: Regressor) -> Self {
        Self {
            model_type: model_type.into(),
            regressor,
        }
    }
}

impl ForecastModel for TrainedModel {
    fn predict(&self, input: &ForecastInput) -> f64 {
        let features = input.features();
        match &self.regressor {
            Regressor::Linear(params) => params.predict(&features),
            Regressor::RandomForest(params) => params.predict(&features),
        }
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }
}
