//! Feature schema and feature records
//!
//! A schema is the named, ordered set of input columns an artifact declares.
//! A record is one row of named values; once bound, its names and order equal
//! the schema exactly.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Column names produced by the input collector
pub mod columns {
    pub const TRAFFIC_LIGHT_STATE: &str = "Traffic_Light_State";
    pub const WEATHER_CONDITION: &str = "Weather_Condition";
    pub const ACCIDENT_REPORT: &str = "Accident_Report";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const VEHICLE_COUNT: &str = "Vehicle_Count";
    pub const TRAFFIC_SPEED_KMH: &str = "Traffic_Speed_kmh";
    pub const ROAD_OCCUPANCY: &str = "Road_Occupancy_%";
    pub const SENTIMENT_SCORE: &str = "Sentiment_Score";
    pub const RIDE_SHARING_DEMAND: &str = "Ride_Sharing_Demand";
    pub const PARKING_AVAILABILITY: &str = "Parking_Availability";
    pub const EMISSION_LEVELS: &str = "Emission_Levels_g_km";
    pub const ENERGY_CONSUMPTION: &str = "Energy_Consumption_L_h";
    pub const HOUR: &str = "Hour";
    pub const DAY: &str = "Day";
    pub const MONTH: &str = "Month";
    pub const WEEKDAY: &str = "Weekday";
}

/// Declared type of an input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => f.write_str("numeric"),
            ColumnKind::Categorical => f.write_str("categorical"),
        }
    }
}

/// One declared input column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Integer codes the artifact was trained with, for a categorical input
    /// it receives pre-encoded. Absent means the standard encoding table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<BTreeMap<String, i64>>,
}

impl ColumnSpec {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric,
            codes: None,
        }
    }

    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Categorical,
            codes: None,
        }
    }

    /// Numeric column fed pre-encoded categories through `codes`
    pub fn encoded(name: &str, codes: &[(&str, i64)]) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric,
            codes: Some(codes.iter().map(|(v, c)| (v.to_string(), *c)).collect()),
        }
    }
}

/// Ordered input schema declared by an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<ColumnSpec>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_categorical(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.kind == ColumnKind::Categorical)
    }

    /// Structural checks run when an artifact is loaded
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("schema declares no input columns".to_string());
        }
        for (i, col) in self.columns.iter().enumerate() {
            if col.name.is_empty() {
                return Err(format!("column {i} has an empty name"));
            }
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(format!("duplicate column {}", col.name));
            }
            match (&col.codes, col.kind) {
                (Some(_), ColumnKind::Categorical) => {
                    return Err(format!(
                        "categorical column {} cannot declare integer codes",
                        col.name
                    ));
                }
                (Some(codes), _) if codes.is_empty() => {
                    return Err(format!("column {} declares an empty code table", col.name));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// A single scalar in a feature record
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Float(f64),
    Int(i64),
    /// Categorical string passed through to the artifact
    Category(String),
    /// Categorical value already translated to its integer code
    Code(i64),
}

impl FeatureValue {
    /// Numeric view of the value; `None` for pass-through strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Int(v) | FeatureValue::Code(v) => Some(*v as f64),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Int(v) | FeatureValue::Code(v) => write!(f, "{v}"),
            FeatureValue::Category(s) => f.write_str(s),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Float(v) => serializer.serialize_f64(*v),
            FeatureValue::Int(v) | FeatureValue::Code(v) => serializer.serialize_i64(*v),
            FeatureValue::Category(s) => serializer.serialize_str(s),
        }
    }
}

/// One row of named feature values, in insertion order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Replaces the value in place if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
