//! Feature schema binding
//!
//! Turns a candidate record from the input collector into a record that
//! satisfies the artifact's declared schema. Column order always comes from
//! the loaded artifact, and only declared columns are selected. Missing or
//! incompatible columns are reported, never corrected.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::artifact::{Artifact, Preprocessor};
use crate::encoding::EncodingTable;
use crate::errors::{Result, TrafficError};
use crate::schema::{ColumnKind, ColumnSpec, FeatureRecord, FeatureSchema, FeatureValue};

/// How categorical inputs reach the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStrategy {
    /// Categories are translated to integer codes before assembly
    PreEncoded,
    /// Categories pass through as strings; the artifact encodes them
    NamedColumns,
}

impl BindingStrategy {
    /// Pick the strategy the schema calls for: any declared categorical
    /// column means the artifact does its own encoding
    pub fn for_schema(schema: &FeatureSchema) -> Self {
        if schema.has_categorical() {
            BindingStrategy::NamedColumns
        } else {
            BindingStrategy::PreEncoded
        }
    }

    pub fn for_artifact(artifact: &Artifact) -> Self {
        Self::for_schema(artifact.schema())
    }
}

impl fmt::Display for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStrategy::PreEncoded => f.write_str("pre-encoded"),
            BindingStrategy::NamedColumns => f.write_str("named-columns"),
        }
    }
}

/// Binds candidate records to one schema
#[derive(Debug, Clone, Copy)]
pub struct SchemaBinder<'a> {
    schema: &'a FeatureSchema,
    strategy: BindingStrategy,
    table: &'static EncodingTable,
    preprocessor: Option<&'a Preprocessor>,
}

impl<'a> SchemaBinder<'a> {
    pub fn new(
        schema: &'a FeatureSchema,
        strategy: BindingStrategy,
        table: &'static EncodingTable,
    ) -> Self {
        Self {
            schema,
            strategy,
            table,
            preprocessor: None,
        }
    }

    /// Match named-column spellings against the artifact's own encoders
    pub fn with_preprocessor(mut self, preprocessor: Option<&'a Preprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Binder for a loaded artifact using the standard encoding table
    pub fn for_artifact(artifact: &'a Artifact) -> Self {
        Self::new(
            artifact.schema(),
            BindingStrategy::for_artifact(artifact),
            EncodingTable::standard(),
        )
        .with_preprocessor(artifact.preprocessor.as_ref())
    }

    pub fn strategy(&self) -> BindingStrategy {
        self.strategy
    }

    /// Produce a record whose names and order equal the schema exactly.
    ///
    /// Categorical membership is checked first, so an unmapped value always
    /// surfaces as `UnknownCategory`. Candidate fields the schema does not
    /// declare are left out.
    pub fn bind(&self, candidate: &FeatureRecord) -> Result<FeatureRecord> {
        for (name, value) in candidate.iter() {
            if let Some(raw) = value.as_category() {
                self.table.canonicalize(name, raw)?;
            }
        }

        let mut bound = FeatureRecord::new();
        for spec in self.schema.columns() {
            let value = candidate.get(&spec.name).ok_or_else(|| {
                TrafficError::SchemaMismatch(format!(
                    "artifact expects column {} which the record does not supply",
                    spec.name
                ))
            })?;
            bound.insert(spec.name.clone(), self.bind_value(spec, value)?);
        }

        debug!(
            strategy = %self.strategy,
            columns = bound.len(),
            unused = candidate.len().saturating_sub(bound.len()),
            "bound record to artifact schema"
        );
        Ok(bound)
    }

    fn bind_value(&self, spec: &ColumnSpec, value: &FeatureValue) -> Result<FeatureValue> {
        let column = spec.name.as_str();
        match (self.strategy, spec.kind, value) {
            (BindingStrategy::PreEncoded, ColumnKind::Numeric, FeatureValue::Category(raw)) => {
                match &spec.codes {
                    Some(codes) => {
                        let spelling = self
                            .table
                            .resolve(column, raw, |s| codes.contains_key(s))?
                            .ok_or_else(|| TrafficError::UnknownCategory {
                                column: column.to_string(),
                                value: raw.clone(),
                            })?;
                        Ok(FeatureValue::Code(codes[spelling]))
                    }
                    None => Ok(FeatureValue::Code(self.table.encode(column, raw)?)),
                }
            }
            (BindingStrategy::NamedColumns, ColumnKind::Categorical, FeatureValue::Category(raw)) => {
                let raw = raw.as_str();
                let encoder = self.preprocessor.and_then(|p| p.encoders.get(column));
                let spelling = match encoder {
                    Some(encoder) => self
                        .table
                        .resolve(column, raw, |s| encoder.categories.iter().any(|c| c == s))?
                        .unwrap_or(raw),
                    None => raw,
                };
                Ok(FeatureValue::Category(spelling.to_string()))
            }
            (_, ColumnKind::Numeric, FeatureValue::Float(_) | FeatureValue::Int(_)) => {
                Ok(value.clone())
            }
            (strategy, kind, value) => Err(TrafficError::SchemaMismatch(format!(
                "column {column} is declared {kind} but the {strategy} strategy supplies {value:?}"
            ))),
        }
    }
}
