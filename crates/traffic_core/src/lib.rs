//! Traffic Condition Prediction Core
//!
//! Binds user-supplied traffic readings to the input schema of a trained
//! classification artifact and runs single-record inference.
//!
//! Modules:
//! - `inputs`: Input collection, declared ranges and constant defaults
//! - `encoding`: Closed categorical encoding table
//! - `schema`: Declared input schema and feature records
//! - `binder`: Schema binding (pre-encoded or named-column strategy)
//! - `classifier`: Integer-only tree ensemble estimator
//! - `artifact`: Artifact format, loader and process-wide cache
//! - `invoker`: Prediction, labels, confidence and failure outcomes
//! - `config`: Layered application configuration

pub mod artifact;
pub mod binder;
pub mod classifier;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod inputs;
pub mod invoker;
pub mod schema;
pub mod serde_canon;

pub use crate::artifact::{Artifact, ArtifactCache, ArtifactLoader, OrdinalEncoder, Preprocessor};
pub use crate::binder::{BindingStrategy, SchemaBinder};
pub use crate::classifier::{ClassLabel, ClassScore, Estimator};
pub use crate::config::AppConfig;
pub use crate::encoding::EncodingTable;
pub use crate::errors::{Result, TrafficError};
pub use crate::inputs::{collect, StaticDefaults, TrafficInputs};
pub use crate::invoker::{Invoker, LabelMap, Outcome, Prediction, FAILURE_MESSAGE};
pub use crate::schema::{ColumnKind, ColumnSpec, FeatureRecord, FeatureSchema, FeatureValue};

/// Crate version string for `inspect` output
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
