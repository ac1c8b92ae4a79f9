//! Input collection
//!
//! Gathers the user-editable fields and the constant default fields into a
//! single candidate record. Ranges are enforced here, at collection time;
//! values inside their range are passed on untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, TrafficError};
use crate::schema::{columns, FeatureRecord, FeatureValue};

/// Declared bounds and default of a numeric input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reject values outside `[min, max]` (and NaN) without clamping
    pub fn check(&self, value: f64) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(TrafficError::InputRange {
                field: self.field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

pub const HOUR_RANGE: NumericRange = NumericRange {
    field: "hour",
    min: 0.0,
    max: 23.0,
    default: 12.0,
};

pub const VEHICLE_COUNT_RANGE: NumericRange = NumericRange {
    field: "vehicle_count",
    min: 0.0,
    max: 1000.0,
    default: 120.0,
};

pub const SPEED_RANGE: NumericRange = NumericRange {
    field: "speed",
    min: 0.0,
    max: 150.0,
    default: 40.0,
};

pub const ROAD_OCCUPANCY_RANGE: NumericRange = NumericRange {
    field: "road_occupancy",
    min: 0.0,
    max: 100.0,
    default: 50.0,
};

/// User-editable fields of one interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficInputs {
    pub traffic_light: String,
    pub weather: String,
    pub accident: String,
    pub hour: i64,
    pub vehicle_count: i64,
    /// Traffic speed in km/h
    pub speed: f64,
    /// Road occupancy in percent
    pub road_occupancy: f64,
}

impl Default for TrafficInputs {
    fn default() -> Self {
        Self {
            traffic_light: "Red".to_string(),
            weather: "Clear".to_string(),
            accident: "No".to_string(),
            hour: HOUR_RANGE.default as i64,
            vehicle_count: VEHICLE_COUNT_RANGE.default as i64,
            speed: SPEED_RANGE.default,
            road_occupancy: ROAD_OCCUPANCY_RANGE.default,
        }
    }
}

impl TrafficInputs {
    /// Check every numeric field against its declared range
    pub fn validate(&self) -> Result<()> {
        HOUR_RANGE.check(self.hour as f64)?;
        VEHICLE_COUNT_RANGE.check(self.vehicle_count as f64)?;
        SPEED_RANGE.check(self.speed)?;
        ROAD_OCCUPANCY_RANGE.check(self.road_occupancy)?;
        Ok(())
    }
}

/// Constant fields injected into every record.
///
/// These are fixed placeholders, not derived from the request context. The
/// sensor fields (ride demand through energy) only reach artifacts that
/// declare those columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticDefaults {
    pub latitude: f64,
    pub longitude: f64,
    pub sentiment: f64,
    pub ride_demand: i64,
    pub parking: i64,
    /// Emission level in g/km
    pub emission: f64,
    /// Energy consumption in L/h
    pub energy: f64,
    pub day: i64,
    pub month: i64,
    pub weekday: i64,
}

impl Default for StaticDefaults {
    fn default() -> Self {
        Self {
            latitude: 13.0827,
            longitude: 80.2707,
            sentiment: 0.1,
            ride_demand: 50,
            parking: 30,
            emission: 120.0,
            energy: 8.0,
            day: 15,
            month: 6,
            weekday: 2,
        }
    }
}

impl StaticDefaults {
    /// Placeholders the pre-encoded sensor models were served with
    pub fn bengaluru() -> Self {
        Self {
            latitude: 12.97,
            longitude: 77.59,
            sentiment: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, f64, f64, f64); 10] = [
            ("defaults.latitude", self.latitude, -90.0, 90.0),
            ("defaults.longitude", self.longitude, -180.0, 180.0),
            ("defaults.sentiment", self.sentiment, -1.0, 1.0),
            ("defaults.ride_demand", self.ride_demand as f64, 0.0, f64::MAX),
            ("defaults.parking", self.parking as f64, 0.0, f64::MAX),
            ("defaults.emission", self.emission, 0.0, f64::MAX),
            ("defaults.energy", self.energy, 0.0, f64::MAX),
            ("defaults.day", self.day as f64, 1.0, 31.0),
            ("defaults.month", self.month as f64, 1.0, 12.0),
            ("defaults.weekday", self.weekday as f64, 0.0, 6.0),
        ];
        for (name, value, min, max) in checks {
            if !(value >= min && value <= max) {
                return Err(TrafficError::Config(format!(
                    "{name} = {value} is outside [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}

/// Assemble user inputs and defaults into a candidate record.
///
/// Categorical values are carried as raw strings; the binder decides how
/// they reach the artifact and which of these fields it declares.
pub fn collect(inputs: &TrafficInputs, defaults: &StaticDefaults) -> Result<FeatureRecord> {
    inputs.validate()?;

    let mut record = FeatureRecord::new();
    record.insert(
        columns::TRAFFIC_LIGHT_STATE,
        FeatureValue::Category(inputs.traffic_light.clone()),
    );
    record.insert(
        columns::WEATHER_CONDITION,
        FeatureValue::Category(inputs.weather.clone()),
    );
    record.insert(
        columns::ACCIDENT_REPORT,
        FeatureValue::Category(inputs.accident.clone()),
    );
    record.insert(columns::LATITUDE, FeatureValue::Float(defaults.latitude));
    record.insert(columns::LONGITUDE, FeatureValue::Float(defaults.longitude));
    record.insert(columns::VEHICLE_COUNT, FeatureValue::Int(inputs.vehicle_count));
    record.insert(columns::TRAFFIC_SPEED_KMH, FeatureValue::Float(inputs.speed));
    record.insert(columns::ROAD_OCCUPANCY, FeatureValue::Float(inputs.road_occupancy));
    record.insert(columns::SENTIMENT_SCORE, FeatureValue::Float(defaults.sentiment));
    record.insert(columns::RIDE_SHARING_DEMAND, FeatureValue::Int(defaults.ride_demand));
    record.insert(columns::PARKING_AVAILABILITY, FeatureValue::Int(defaults.parking));
    record.insert(columns::EMISSION_LEVELS, FeatureValue::Float(defaults.emission));
    record.insert(columns::ENERGY_CONSUMPTION, FeatureValue::Float(defaults.energy));
    record.insert(columns::HOUR, FeatureValue::Int(inputs.hour));
    record.insert(columns::DAY, FeatureValue::Int(defaults.day));
    record.insert(columns::MONTH, FeatureValue::Int(defaults.month));
    record.insert(columns::WEEKDAY, FeatureValue::Int(defaults.weekday));

    debug!(fields = record.len(), "collected candidate record");
    Ok(record)
}
