use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use traffic_core::classifier::{ClassLabel, ClassScore, Estimator, Node, Tree, SCALE};
use traffic_core::schema::columns;
use traffic_core::{Artifact, ColumnSpec, FeatureSchema, Invoker, StaticDefaults, TrafficInputs};

fn sample_artifact() -> Artifact {
    // Two classes split on road occupancy, values scaled by `SCALE`.
    let names = [
        columns::TRAFFIC_LIGHT_STATE,
        columns::WEATHER_CONDITION,
        columns::ACCIDENT_REPORT,
        columns::LATITUDE,
        columns::LONGITUDE,
        columns::VEHICLE_COUNT,
        columns::TRAFFIC_SPEED_KMH,
        columns::ROAD_OCCUPANCY,
        columns::SENTIMENT_SCORE,
        columns::HOUR,
        columns::DAY,
        columns::MONTH,
        columns::WEEKDAY,
    ];
    let schema = FeatureSchema::new(names.iter().map(|n| ColumnSpec::numeric(n)).collect());
    let tree = Tree::new(
        vec![
            Node::internal(0, 7, 60 * SCALE, 1, 2),
            Node::leaf(1, -SCALE),
            Node::leaf(2, SCALE),
        ],
        SCALE,
    );
    let estimator = Estimator::new(
        vec![ClassLabel::Code(0), ClassLabel::Code(2)],
        vec![ClassScore::new(vec![], 0), ClassScore::new(vec![tree], 0)],
    )
    .with_probabilities();

    Artifact::new("bench", schema, None, estimator).expect("valid bench artifact")
}

fn bench_single_interaction(c: &mut Criterion) {
    let invoker = Invoker::new(Arc::new(sample_artifact()), StaticDefaults::default());
    let inputs = TrafficInputs::default();

    c.bench_function("traffic_single_interaction", |b| {
        b.iter(|| {
            let outcome = invoker.run(black_box(&inputs));
            black_box(outcome);
        });
    });
}

criterion_group!(traffic_benches, bench_single_interaction);
criterion_main!(traffic_benches);
