//! End-to-end interactions against the shipped sample artifacts and
//! artifacts written to temporary files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use traffic_core::classifier::{ClassLabel, ClassScore, Estimator, Node, Tree, SCALE};
use traffic_core::invoker::confidence_percent;
use traffic_core::schema::columns;
use traffic_core::{
    Artifact, ArtifactCache, ArtifactLoader, BindingStrategy, ColumnSpec, FeatureSchema,
    FeatureValue, Invoker, Outcome, StaticDefaults, TrafficError, TrafficInputs, FAILURE_MESSAGE,
};

const OUTPUT_LABELS: [&str; 4] = [
    "Low Traffic",
    "Moderate Traffic",
    "High Traffic",
    "Severe Congestion",
];

fn model_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../models")
        .join(name)
}

fn load(name: &str) -> Arc<Artifact> {
    Arc::new(ArtifactLoader::new().load(&model_path(name)).expect("sample artifact loads"))
}

fn scenario_inputs() -> TrafficInputs {
    TrafficInputs {
        traffic_light: "Green".to_string(),
        weather: "Clear".to_string(),
        accident: "No".to_string(),
        hour: 12,
        vehicle_count: 120,
        speed: 40.0,
        road_occupancy: 50.0,
    }
}

fn write_artifact(artifact: &Artifact) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(artifact).unwrap().as_bytes())
        .unwrap();
    file
}

/// Pre-encoded artifact declaring only speed and occupancy
fn narrow_artifact(with_proba: bool) -> Artifact {
    let schema = FeatureSchema::new(vec![
        ColumnSpec::numeric(columns::TRAFFIC_SPEED_KMH),
        ColumnSpec::numeric(columns::ROAD_OCCUPANCY),
    ]);
    let fast = Tree::new(
        vec![
            Node::internal(0, 0, 30 * SCALE, 1, 2),
            Node::leaf(1, -SCALE),
            Node::leaf(2, SCALE),
        ],
        SCALE,
    );
    let crowded = Tree::new(
        vec![
            Node::internal(0, 1, 60 * SCALE, 1, 2),
            Node::leaf(1, 0),
            Node::leaf(2, 2 * SCALE),
        ],
        SCALE,
    );
    let mut estimator = Estimator::new(
        vec![ClassLabel::Code(0), ClassLabel::Code(2)],
        vec![ClassScore::new(vec![fast], 0), ClassScore::new(vec![crowded], 0)],
    );
    if with_proba {
        estimator = estimator.with_probabilities();
    }
    Artifact::new("narrow", schema, None, estimator).unwrap()
}

#[test]
fn sample_pipeline_scenario() {
    let artifact = load("traffic_model.json");
    assert_eq!(BindingStrategy::for_artifact(&artifact), BindingStrategy::NamedColumns);

    let invoker = Invoker::new(Arc::clone(&artifact), StaticDefaults::default());
    let record = invoker.bind(&scenario_inputs()).unwrap();
    assert!(record.names().eq(artifact.schema().names()));

    let prediction = invoker.infer(&record).unwrap();
    assert!(OUTPUT_LABELS.contains(&prediction.label.as_str()));
    assert_eq!(prediction.label, "Moderate Traffic");

    let confidence = prediction.confidence.expect("pipeline offers probabilities");
    assert!((0.0..=100.0).contains(&confidence));
}

#[test]
fn sample_encoded_scenario_omits_confidence() {
    let artifact = load("traffic_model_encoded.json");
    assert_eq!(BindingStrategy::for_artifact(&artifact), BindingStrategy::PreEncoded);

    let invoker = Invoker::new(artifact, StaticDefaults::default());
    let prediction = invoker.predict(&scenario_inputs()).unwrap();

    assert_eq!(prediction.raw_class, ClassLabel::Code(1));
    assert_eq!(prediction.label, "Moderate Traffic");
    assert_eq!(prediction.confidence, None);
    assert_eq!(prediction.probabilities, None);
}

#[test]
fn confidence_is_rounded_max_probability() {
    let artifact = load("traffic_model.json");
    let invoker = Invoker::new(artifact, StaticDefaults::default());
    let prediction = invoker.predict(&scenario_inputs()).unwrap();

    let probabilities = prediction.probabilities.clone().unwrap();
    let max = probabilities.iter().cloned().fold(f64::MIN, f64::max);
    assert_eq!(prediction.confidence, Some((max * 100.0 * 100.0).round() / 100.0));
    assert_eq!(prediction.confidence, confidence_percent(&probabilities));
}

#[test]
fn repeated_interactions_are_identical() {
    for name in ["traffic_model.json", "traffic_model_encoded.json"] {
        let invoker = Invoker::new(load(name), StaticDefaults::default());
        let first = invoker.run(&scenario_inputs());
        let second = invoker.run(&scenario_inputs());
        assert_eq!(first, second);
        assert!(first.prediction().is_some());
    }
}

#[test]
fn hour_boundaries_bind_and_infer() {
    for name in ["traffic_model.json", "traffic_model_encoded.json"] {
        let invoker = Invoker::new(load(name), StaticDefaults::default());
        for hour in [0, 23] {
            let inputs = TrafficInputs {
                hour,
                ..scenario_inputs()
            };
            let prediction = invoker.predict(&inputs).unwrap();
            assert!(OUTPUT_LABELS.contains(&prediction.label.as_str()));
        }
    }
}

#[test]
fn unknown_weather_never_reaches_the_model() {
    for name in ["traffic_model.json", "traffic_model_encoded.json"] {
        let invoker = Invoker::new(load(name), StaticDefaults::default());
        let inputs = TrafficInputs {
            weather: "Hurricane".to_string(),
            ..scenario_inputs()
        };

        match invoker.predict(&inputs) {
            Err(TrafficError::UnknownCategory { column, value }) => {
                assert_eq!(column, columns::WEATHER_CONDITION);
                assert_eq!(value, "Hurricane");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }

        match invoker.run(&inputs) {
            Outcome::Failed {
                message,
                diagnostic,
            } => {
                assert_eq!(message, FAILURE_MESSAGE);
                assert!(diagnostic.contains("Hurricane"));
            }
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }
}

#[test]
fn named_columns_keep_the_encoders_spelling() {
    let json = std::fs::read_to_string(model_path("traffic_model.json")).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["preprocessor"]["encoders"][columns::WEATHER_CONDITION]["categories"] =
        serde_json::json!(["Clear", "Foggy", "Rainy"]);
    let artifact = Arc::new(Artifact::from_json_str(&value.to_string()).unwrap());
    let invoker = Invoker::new(Arc::clone(&artifact), StaticDefaults::default());

    let rainy = TrafficInputs {
        weather: "Rainy".to_string(),
        ..scenario_inputs()
    };
    let record = invoker.bind(&rainy).unwrap();
    assert_eq!(
        record.get(columns::WEATHER_CONDITION),
        Some(&FeatureValue::Category("Rainy".into()))
    );
    let expected = invoker.predict(&rainy).unwrap();

    let rain = TrafficInputs {
        weather: "Rain".to_string(),
        ..scenario_inputs()
    };
    assert_eq!(invoker.predict(&rain).unwrap(), expected);

    // Valid input, but this encoder was never fit on it
    let snow = TrafficInputs {
        weather: "Snow".to_string(),
        ..scenario_inputs()
    };
    assert!(matches!(
        invoker.predict(&snow),
        Err(TrafficError::PredictionFailure(_))
    ));
}

#[test]
fn schema_mismatch_is_reported_not_fatal() {
    let mut value = serde_json::to_value(narrow_artifact(true)).unwrap();
    value["input_columns"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"name": "Visibility_km", "kind": "numeric"}));
    let artifact = Artifact::from_json_str(&value.to_string()).unwrap();
    let invoker = Invoker::new(Arc::new(artifact), StaticDefaults::default());

    assert!(matches!(
        invoker.predict(&scenario_inputs()),
        Err(TrafficError::SchemaMismatch(_))
    ));

    match invoker.run(&scenario_inputs()) {
        Outcome::Failed { diagnostic, .. } => {
            assert!(diagnostic.contains("Schema mismatch"));
            assert!(diagnostic.contains("Visibility_km"));
        }
        other => panic!("expected failure outcome, got {other:?}"),
    }
}

#[test]
fn narrow_schema_selects_only_declared_fields() {
    let invoker = Invoker::new(Arc::new(narrow_artifact(false)), StaticDefaults::default());
    let record = invoker.bind(&scenario_inputs()).unwrap();
    assert_eq!(
        record.names().collect::<Vec<_>>(),
        vec![columns::TRAFFIC_SPEED_KMH, columns::ROAD_OCCUPANCY]
    );
    assert!(invoker.predict(&scenario_inputs()).is_ok());
}

/// Pre-encoded artifact laid out like the sensor-dashboard models: 17
/// positional columns with the categorical codes in the middle
fn sensor_artifact() -> Artifact {
    let schema = FeatureSchema::new(
        [
            columns::LATITUDE,
            columns::LONGITUDE,
            columns::VEHICLE_COUNT,
            columns::TRAFFIC_SPEED_KMH,
            columns::ROAD_OCCUPANCY,
            columns::TRAFFIC_LIGHT_STATE,
            columns::WEATHER_CONDITION,
            columns::ACCIDENT_REPORT,
            columns::SENTIMENT_SCORE,
            columns::RIDE_SHARING_DEMAND,
            columns::PARKING_AVAILABILITY,
            columns::EMISSION_LEVELS,
            columns::ENERGY_CONSUMPTION,
            columns::HOUR,
            columns::DAY,
            columns::MONTH,
            columns::WEEKDAY,
        ]
        .iter()
        .map(|name| ColumnSpec::numeric(name))
        .collect(),
    );
    // Green (code 2) is the only light above the split
    let light = Tree::new(
        vec![
            Node::internal(0, 5, SCALE, 1, 2),
            Node::leaf(1, -SCALE),
            Node::leaf(2, SCALE),
        ],
        SCALE,
    );
    let estimator = Estimator::new(
        vec![ClassLabel::Code(0), ClassLabel::Code(3)],
        vec![ClassScore::new(vec![], 0), ClassScore::new(vec![light], 0)],
    );
    Artifact::new("sensor", schema, None, estimator).unwrap()
}

#[test]
fn sensor_layout_binds_seventeen_columns() {
    let artifact = Arc::new(sensor_artifact());
    let invoker = Invoker::new(Arc::clone(&artifact), StaticDefaults::bengaluru());

    let record = invoker.bind(&scenario_inputs()).unwrap();
    assert_eq!(record.len(), 17);
    assert!(record.names().eq(artifact.schema().names()));
    assert_eq!(record.get(columns::TRAFFIC_LIGHT_STATE), Some(&FeatureValue::Code(2)));
    assert_eq!(record.get(columns::PARKING_AVAILABILITY), Some(&FeatureValue::Int(30)));
    assert_eq!(record.get(columns::LATITUDE), Some(&FeatureValue::Float(12.97)));

    assert_eq!(invoker.predict(&scenario_inputs()).unwrap().label, "Severe Congestion");
    let red = TrafficInputs {
        traffic_light: "Red".to_string(),
        ..scenario_inputs()
    };
    assert_eq!(invoker.predict(&red).unwrap().label, "Low Traffic");
}

#[test]
fn one_record_batch_yields_one_answer() {
    let artifact = load("traffic_model.json");
    let invoker = Invoker::new(Arc::clone(&artifact), StaticDefaults::default());
    let record = invoker.bind(&scenario_inputs()).unwrap();
    let batch = std::slice::from_ref(&record);

    let classes = artifact.predict(batch).unwrap();
    let probabilities = artifact.predict_proba(batch).unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(probabilities.len(), 1);
    assert_eq!(probabilities[0].len(), artifact.classes().len());

    let prediction = invoker.infer(&record).unwrap();
    assert_eq!(prediction.raw_class, classes[0]);
    assert_eq!(prediction.probabilities.as_ref(), Some(&probabilities[0]));
}

#[test]
fn proba_capability_decides_confidence() {
    let mut record = traffic_core::FeatureRecord::new();
    record.insert(columns::TRAFFIC_SPEED_KMH, FeatureValue::Float(20.0));
    record.insert(columns::ROAD_OCCUPANCY, FeatureValue::Float(80.0));

    let without = Invoker::new(Arc::new(narrow_artifact(false)), StaticDefaults::default());
    let plain = without.infer(&record).unwrap();
    assert_eq!(plain.label, "High Traffic");
    assert_eq!(plain.confidence, None);

    let with = Invoker::new(Arc::new(narrow_artifact(true)), StaticDefaults::default());
    let scored = with.infer(&record).unwrap();
    assert_eq!(scored.label, "High Traffic");
    // raw scores -1.0 and 2.0
    let expected = 1.0 / (1.0 + (-3.0f64).exp());
    assert_eq!(scored.confidence, Some((expected * 10_000.0).round() / 100.0));
}

#[test]
fn cache_reuses_the_loaded_artifact() {
    let file = write_artifact(&narrow_artifact(false));
    let cache = ArtifactCache::new();
    let loader = ArtifactLoader::new();

    let first = cache.get_or_load(file.path(), &loader).unwrap();
    let second = cache.get_or_load(file.path(), &loader).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn pinned_fingerprint_is_enforced() {
    let artifact = narrow_artifact(false);
    let file = write_artifact(&artifact);

    let good = ArtifactLoader::new().with_expected_hash(artifact.fingerprint().to_uppercase());
    assert!(good.load(file.path()).is_ok());

    let bad = ArtifactLoader::new().with_expected_hash("0".repeat(64));
    let err = bad.load(file.path()).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("fingerprint mismatch"));

    let cache = ArtifactCache::new();
    cache.get_or_load(file.path(), &ArtifactLoader::new()).unwrap();
    assert!(cache.get_or_load(file.path(), &bad).is_err());
}

#[test]
fn structurally_invalid_artifact_fails_to_load() {
    let mut value = serde_json::to_value(narrow_artifact(false)).unwrap();
    value["estimator"]["class_scores"][0]["trees"][0]["nodes"][0]["feature_idx"] =
        serde_json::json!(7);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(value.to_string().as_bytes()).unwrap();

    match ArtifactLoader::new().load(file.path()) {
        Err(TrafficError::ArtifactLoadFailure { reason, .. }) => {
            assert!(reason.contains("feature index"))
        }
        other => panic!("expected load failure, got {other:?}"),
    }
}

#[test]
fn custom_defaults_flow_into_the_record() {
    let defaults = StaticDefaults {
        month: 12,
        ..StaticDefaults::default()
    };
    let invoker = Invoker::new(load("traffic_model_encoded.json"), defaults);
    let record = invoker.bind(&scenario_inputs()).unwrap();
    assert_eq!(
        record.get(columns::MONTH),
        Some(&FeatureValue::Int(12))
    );
}
