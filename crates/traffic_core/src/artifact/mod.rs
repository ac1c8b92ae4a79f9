//! Model artifacts
//!
//! An artifact is the trained classifier as persisted by the external
//! training process: its declared input schema, an optional preprocessor
//! that encodes categorical string columns itself, and the tree ensemble
//! estimator. Artifacts are immutable once loaded.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::{ClassLabel, Estimator};
use crate::errors::{Result, TrafficError};
use crate::schema::{ColumnKind, FeatureRecord, FeatureSchema, FeatureValue};
use crate::serde_canon::hash_canonical_hex;

pub use loader::{ArtifactCache, ArtifactLoader};

/// Only supported artifact format version
pub const FORMAT_VERSION: u32 = 1;

/// What an internal encoder does with a category it was not fit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    UseEncodedValue,
}

/// Ordinal encoder for one categorical column: the code is the index of the
/// value in `categories`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    pub categories: Vec<String>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_value: Option<i64>,
}

impl OrdinalEncoder {
    pub fn new(categories: &[&str]) -> Self {
        Self {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            handle_unknown: HandleUnknown::Error,
            unknown_value: None,
        }
    }

    fn encode(&self, column: &str, value: &str) -> Result<f64> {
        if let Some(idx) = self.categories.iter().position(|c| c == value) {
            return Ok(idx as f64);
        }
        match (self.handle_unknown, self.unknown_value) {
            (HandleUnknown::UseEncodedValue, Some(code)) => Ok(code as f64),
            _ => Err(TrafficError::PredictionFailure(format!(
                "Found unknown category {value:?} in column {column} during transform"
            ))),
        }
    }

    fn validate(&self, column: &str) -> std::result::Result<(), String> {
        if self.categories.is_empty() {
            return Err(format!("encoder for {column} has no categories"));
        }
        for (i, cat) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(cat) {
                return Err(format!("encoder for {column} repeats category {cat}"));
            }
        }
        if self.handle_unknown == HandleUnknown::UseEncodedValue && self.unknown_value.is_none() {
            return Err(format!(
                "encoder for {column} uses use_encoded_value without unknown_value"
            ));
        }
        Ok(())
    }
}

/// Internal preprocessing step of a pipeline artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Preprocessor {
    pub encoders: BTreeMap<String, OrdinalEncoder>,
}

/// A loaded model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,

    #[serde(default)]
    pub name: String,

    /// Declared input columns, in the order the estimator was fit on
    pub input_columns: FeatureSchema,

    /// Present when the artifact encodes its own categorical columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<Preprocessor>,

    pub estimator: Estimator,

    #[serde(skip)]
    fingerprint: String,
}

impl Artifact {
    pub fn new(
        name: &str,
        input_columns: FeatureSchema,
        preprocessor: Option<Preprocessor>,
        estimator: Estimator,
    ) -> Result<Self> {
        let mut artifact = Self {
            format_version: FORMAT_VERSION,
            name: name.to_string(),
            input_columns,
            preprocessor,
            estimator,
            fingerprint: String::new(),
        };
        artifact.seal().map_err(|reason| TrafficError::load_failure(name, reason))?;
        Ok(artifact)
    }

    /// Parse, validate and fingerprint an artifact document
    pub fn from_json_str(json: &str) -> std::result::Result<Self, String> {
        let mut artifact: Artifact =
            serde_json::from_str(json).map_err(|e| format!("invalid artifact JSON: {e}"))?;
        artifact.seal()?;
        Ok(artifact)
    }

    fn seal(&mut self) -> std::result::Result<(), String> {
        self.validate()?;
        self.fingerprint = hash_canonical_hex(self).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.input_columns
    }

    /// BLAKE3 hex digest of the canonical JSON form
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether the estimator exposes class probabilities
    pub fn supports_proba(&self) -> bool {
        self.estimator.supports_proba()
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.estimator.classes
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported artifact format version {}",
                self.format_version
            ));
        }

        self.input_columns.validate()?;

        let categorical: Vec<&str> = self
            .input_columns
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name.as_str())
            .collect();

        match &self.preprocessor {
            None if !categorical.is_empty() => {
                return Err(format!(
                    "categorical columns {categorical:?} declared without a preprocessor"
                ));
            }
            None => {}
            Some(pre) => {
                for column in &categorical {
                    let encoder = pre
                        .encoders
                        .get(*column)
                        .ok_or_else(|| format!("no encoder for categorical column {column}"))?;
                    encoder.validate(column)?;
                }
                if let Some(extra) = pre
                    .encoders
                    .keys()
                    .find(|k| !categorical.contains(&k.as_str()))
                {
                    return Err(format!("encoder for undeclared categorical column {extra}"));
                }
            }
        }

        self.estimator
            .validate(self.input_columns.len())
            .map_err(|e| e.to_string())
    }

    /// Encode a bound record into the estimator's numeric row.
    ///
    /// The record's names and order must equal the declared columns.
    pub fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>> {
        let declared: Vec<&str> = self.input_columns.names().collect();
        let supplied: Vec<&str> = record.names().collect();
        if declared != supplied {
            return Err(TrafficError::SchemaMismatch(format!(
                "feature names should match those that were passed during fit: expected {declared:?}, got {supplied:?}"
            )));
        }

        self.input_columns
            .columns()
            .iter()
            .zip(record.iter())
            .map(|(spec, (_, value))| match (spec.kind, value) {
                (ColumnKind::Categorical, FeatureValue::Category(raw)) => {
                    let encoder = self
                        .preprocessor
                        .as_ref()
                        .and_then(|p| p.encoders.get(&spec.name))
                        .ok_or_else(|| {
                            TrafficError::PredictionFailure(format!(
                                "no encoder for column {}",
                                spec.name
                            ))
                        })?;
                    encoder.encode(&spec.name, raw)
                }
                (ColumnKind::Numeric, value) => value.as_f64().ok_or_else(|| {
                    TrafficError::SchemaMismatch(format!(
                        "column {} expects a numeric value, got {value:?}",
                        spec.name
                    ))
                }),
                (ColumnKind::Categorical, value) => Err(TrafficError::SchemaMismatch(format!(
                    "column {} expects a category string, got {value:?}",
                    spec.name
                ))),
            })
            .collect()
    }

    /// Predict one class per record
    pub fn predict(&self, records: &[FeatureRecord]) -> Result<Vec<ClassLabel>> {
        let rows = self.transform_all(records)?;
        self.estimator
            .predict(&rows)
            .map_err(|e| TrafficError::PredictionFailure(e.to_string()))
    }

    /// Class probabilities per record, aligned with [`Artifact::classes`]
    pub fn predict_proba(&self, records: &[FeatureRecord]) -> Result<Vec<Vec<f64>>> {
        let rows = self.transform_all(records)?;
        self.estimator
            .predict_proba(&rows)
            .map_err(|e| TrafficError::PredictionFailure(e.to_string()))
    }

    fn transform_all(&self, records: &[FeatureRecord]) -> Result<Vec<Vec<f64>>> {
        records.iter().map(|r| self.transform(r)).collect()
    }
}
