//! Inference invocation
//!
//! One interaction: collect inputs, bind them to the artifact schema, predict
//! a single record, map the raw class to a label and, when the artifact
//! offers probabilities, report the winning probability as a confidence.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::binder::{BindingStrategy, SchemaBinder};
use crate::classifier::ClassLabel;
use crate::errors::{Result, TrafficError};
use crate::inputs::{collect, StaticDefaults, TrafficInputs};
use crate::schema::FeatureRecord;

/// User-facing text shown whenever an interaction fails
pub const FAILURE_MESSAGE: &str = "Prediction failed. Check model & input consistency.";

/// Labels for artifacts whose classes are raw integer codes
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: BTreeMap<i64, String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        let labels = [
            (0, "Low Traffic"),
            (1, "Moderate Traffic"),
            (2, "High Traffic"),
            (3, "Severe Congestion"),
        ]
        .into_iter()
        .map(|(code, label)| (code, label.to_string()))
        .collect();
        Self { labels }
    }
}

impl LabelMap {
    pub fn new(labels: BTreeMap<i64, String>) -> Self {
        Self { labels }
    }

    /// Human-readable label for a class; string classes are used verbatim
    pub fn label(&self, class: &ClassLabel) -> Result<String> {
        match class {
            ClassLabel::Name(name) => Ok(name.clone()),
            ClassLabel::Code(code) => self.labels.get(code).cloned().ok_or_else(|| {
                TrafficError::PredictionFailure(format!("class code {code} has no label"))
            }),
        }
    }
}

/// Result of one successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub raw_class: ClassLabel,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
    /// Maximum class probability in percent, two decimals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// What one interaction produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Predicted(Prediction),
    Failed { message: String, diagnostic: String },
}

impl Outcome {
    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Outcome::Predicted(p) => Some(p),
            Outcome::Failed { .. } => None,
        }
    }
}

/// Round `max(probabilities) * 100` to two decimals
pub fn confidence_percent(probabilities: &[f64]) -> Option<f64> {
    let max = probabilities.iter().copied().fold(None, |acc: Option<f64>, p| {
        Some(acc.map_or(p, |a| a.max(p)))
    })?;
    Some((max * 100.0 * 100.0).round() / 100.0)
}

/// Runs interactions against one shared, read-only artifact
#[derive(Debug, Clone)]
pub struct Invoker {
    artifact: Arc<Artifact>,
    defaults: StaticDefaults,
    labels: LabelMap,
}

impl Invoker {
    pub fn new(artifact: Arc<Artifact>, defaults: StaticDefaults) -> Self {
        Self {
            artifact,
            defaults,
            labels: LabelMap::default(),
        }
    }

    pub fn with_labels(mut self, labels: LabelMap) -> Self {
        self.labels = labels;
        self
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn strategy(&self) -> BindingStrategy {
        BindingStrategy::for_artifact(&self.artifact)
    }

    /// Collect and bind inputs into a schema-conformant record
    pub fn bind(&self, inputs: &TrafficInputs) -> Result<FeatureRecord> {
        let candidate = collect(inputs, &self.defaults)?;
        SchemaBinder::for_artifact(&self.artifact).bind(&candidate)
    }

    /// Predict a bound record: a one-record batch, answer at index 0
    pub fn infer(&self, record: &FeatureRecord) -> Result<Prediction> {
        let batch = std::slice::from_ref(record);

        let raw_class = self
            .artifact
            .predict(batch)?
            .into_iter()
            .next()
            .ok_or_else(|| TrafficError::PredictionFailure("estimator returned no prediction".into()))?;
        let label = self.labels.label(&raw_class)?;

        let probabilities = if self.artifact.supports_proba() {
            let row = self
                .artifact
                .predict_proba(batch)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    TrafficError::PredictionFailure("estimator returned no probabilities".into())
                })?;
            Some(row)
        } else {
            None
        };
        let confidence = probabilities.as_deref().and_then(confidence_percent);

        debug!(%label, ?confidence, "prediction complete");
        Ok(Prediction {
            raw_class,
            label,
            probabilities,
            confidence,
        })
    }

    /// Bind and predict, propagating errors
    pub fn predict(&self, inputs: &TrafficInputs) -> Result<Prediction> {
        let record = self.bind(inputs)?;
        self.infer(&record)
    }

    /// One full interaction. Never fails: errors become `Outcome::Failed`.
    pub fn run(&self, inputs: &TrafficInputs) -> Outcome {
        match self.predict(inputs) {
            Ok(prediction) => Outcome::Predicted(prediction),
            Err(err) => {
                warn!(error = %err, "interaction failed");
                Outcome::Failed {
                    message: FAILURE_MESSAGE.to_string(),
                    diagnostic: err.to_string(),
                }
            }
        }
    }
}
