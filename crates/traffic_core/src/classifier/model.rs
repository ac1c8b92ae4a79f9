//! Multi-class tree ensemble estimator
//!
//! Each class owns an ensemble of integer-only trees. The raw score of a
//! class is its bias plus the weighted leaf values of its trees; the
//! predicted class is the highest raw score and probabilities are a softmax
//! over raw scores.

use super::tree::Tree;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Estimator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Tree traversal failed: {0}")]
    Traversal(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Estimator does not support {0}")]
    Unsupported(&'static str),
}

/// Default scale factor for fixed-point arithmetic (1e6)
pub const SCALE: i64 = 1_000_000;

fn default_scale() -> i64 {
    SCALE
}

/// A class as stored in the artifact: a raw integer code or a label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ClassLabel {
    Code(i64),
    Name(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Code(code) => write!(f, "{code}"),
            ClassLabel::Name(name) => f.write_str(name),
        }
    }
}

/// Tree ensemble producing the raw score of one class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassScore {
    /// Bias term (fixed-point)
    #[serde(default)]
    pub bias: i64,

    pub trees: Vec<Tree>,
}

impl ClassScore {
    pub fn new(trees: Vec<Tree>, bias: i64) -> Self {
        Self { bias, trees }
    }

    /// Accumulate `leaf * weight / scale` over all trees, starting at bias
    fn score(&self, features: &[i64], scale: i64) -> Result<i64, ModelError> {
        let mut sum = self.bias;
        for tree in &self.trees {
            let leaf_value = tree.evaluate(features)?;
            let weighted = leaf_value.checked_mul(tree.weight).ok_or_else(|| {
                ModelError::InvalidInput("leaf value overflow while weighting".to_string())
            })?;
            sum = sum.saturating_add(weighted / scale);
        }
        Ok(sum)
    }
}

/// Multi-class tree ensemble classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Estimator {
    /// Fixed-point scale shared by features, thresholds and leaves
    #[serde(default = "default_scale")]
    pub scale: i64,

    /// Classes in score order
    pub classes: Vec<ClassLabel>,

    /// One ensemble per class, aligned with `classes`
    pub class_scores: Vec<ClassScore>,

    /// Whether the estimator offers class probabilities
    #[serde(default)]
    pub predict_proba: bool,
}

impl Estimator {
    pub fn new(classes: Vec<ClassLabel>, class_scores: Vec<ClassScore>) -> Self {
        Self {
            scale: SCALE,
            classes,
            class_scores,
            predict_proba: false,
        }
    }

    pub fn with_probabilities(mut self) -> Self {
        self.predict_proba = true;
        self
    }

    pub fn supports_proba(&self) -> bool {
        self.predict_proba
    }

    /// Validate structure against the width of the encoded feature vector
    pub fn validate(&self, feature_count: usize) -> Result<(), ModelError> {
        if self.scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        if self.classes.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Estimator declares no classes".to_string(),
            ));
        }

        if self.classes.len() != self.class_scores.len() {
            return Err(ModelError::ValidationFailed(format!(
                "{} classes but {} class ensembles",
                self.classes.len(),
                self.class_scores.len()
            )));
        }

        for (i, class) in self.classes.iter().enumerate() {
            if self.classes[..i].contains(class) {
                return Err(ModelError::ValidationFailed(format!(
                    "Duplicate class {class}"
                )));
            }
        }

        for (c, ensemble) in self.class_scores.iter().enumerate() {
            for (t, tree) in ensemble.trees.iter().enumerate() {
                tree.validate(feature_count).map_err(|e| {
                    ModelError::ValidationFailed(format!("Class {c} tree {t}: {e}"))
                })?;
            }
        }

        Ok(())
    }

    /// Convert encoded real-valued features to fixed-point integers
    pub fn quantize(&self, row: &[f64]) -> Result<Vec<i64>, ModelError> {
        let limit = i64::MAX as f64;
        row.iter()
            .enumerate()
            .map(|(i, value)| {
                let scaled = (value * self.scale as f64).round();
                if !scaled.is_finite() || scaled.abs() >= limit {
                    return Err(ModelError::InvalidInput(format!(
                        "feature {i} value {value} cannot be represented at scale {}",
                        self.scale
                    )));
                }
                Ok(scaled as i64)
            })
            .collect()
    }

    /// Raw fixed-point score of every class for one row
    pub fn raw_scores(&self, row: &[f64]) -> Result<Vec<i64>, ModelError> {
        let features = self.quantize(row)?;
        self.class_scores
            .iter()
            .map(|ensemble| ensemble.score(&features, self.scale))
            .collect()
    }

    /// Predict one class per row. Ties resolve to the earliest class.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<ClassLabel>, ModelError> {
        rows.iter()
            .map(|row| {
                let scores = self.raw_scores(row)?;
                let best = scores
                    .iter()
                    .enumerate()
                    .fold(0usize, |best, (i, s)| if *s > scores[best] { i } else { best });
                Ok(self.classes[best].clone())
            })
            .collect()
    }

    /// Class probability distribution per row, aligned with `classes`
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        if !self.predict_proba {
            return Err(ModelError::Unsupported("predict_proba"));
        }

        rows.iter()
            .map(|row| {
                let scores = self.raw_scores(row)?;
                Ok(softmax(&scores, self.scale))
            })
            .collect()
    }
}

fn softmax(scores: &[i64], scale: i64) -> Vec<f64> {
    let max = scores.iter().copied().max().unwrap_or(0);
    let exps: Vec<f64> = scores
        .iter()
        .map(|s| (s.saturating_sub(max) as f64 / scale as f64).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
