use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use crime_risk::dataset::{FEATURE_NAMES, RiskLevel, SynthOptions, generate};
use crime_risk::ml::forest::{ForestOptions, train_forest};
use crime_risk::predictor::{PredictionInput, predict_with_model};

const SAMPLE_COUNT: usize = 1_000;

fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

fn bench_train(c: &mut Criterion) {
    let dataset = generate(&SynthOptions {
        n_samples: SAMPLE_COUNT,
        seed: 42,
    });
    let x = dataset.features();
    let y = dataset.labels();
    let names = feature_names();
    let classes = RiskLevel::class_names();
    let mut group = c.benchmark_group("train_forest");
    group.sample_size(10);
    for n_trees in [10usize, 100] {
        let options = ForestOptions {
            n_trees,
            ..ForestOptions::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), &options, |b, options| {
            b.iter(|| {
                train_forest(black_box(x.view()), &y, &names, &classes, options)
                    .expect("train_forest");
            });
        });
    }
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let dataset = generate(&SynthOptions {
        n_samples: SAMPLE_COUNT,
        seed: 42,
    });
    let model = train_forest(
        dataset.features().view(),
        &dataset.labels(),
        &feature_names(),
        &RiskLevel::class_names(),
        &ForestOptions::default(),
    )
    .expect("train_forest");
    let input = PredictionInput {
        latitud: -13.45,
        longitud: -71.95,
        hora: 23.0,
        dia_semana: 6.0,
        mes: 5.0,
        tipo_delito: 0.0,
    };
    c.bench_function("predict_single_record", |b| {
        b.iter(|| predict_with_model(&model, black_box(&input)).expect("predict"));
    });
}

criterion_group!(benches, bench_train, bench_predict);
criterion_main!(benches);
