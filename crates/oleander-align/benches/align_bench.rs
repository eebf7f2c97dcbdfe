//! Criterion benchmarks for oleander-align: plain alignment, pairwise
//! matrices, and the noise-robust pipeline.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use oleander_align::{NoiseRobustAligner, RobustConfig, SeriesAligner, TimeSeries};

fn make_sine_series(n: usize, offset: f64) -> TimeSeries {
    let values: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() + offset).collect();
    TimeSeries::new(values).unwrap()
}

fn bench_align(c: &mut Criterion) {
    let lengths = [64usize, 256, 1024];
    let windows: &[(Option<usize>, &str)] = &[
        (None, "unconstrained"),
        (Some(2), "window_2"),
        (Some(10), "window_10"),
    ];

    let mut group = c.benchmark_group("align");

    for &len in &lengths {
        for &(window, label) in windows {
            let id = BenchmarkId::new(format!("len{len}"), label);
            let a = make_sine_series(len, 0.0);
            let b = make_sine_series(len, 1.0);
            let aligner = match window {
                None => SeriesAligner::unconstrained(),
                Some(w) => SeriesAligner::with_window(w),
            };

            group.bench_with_input(id, &(a, b, aligner), |bencher, (a, b, aligner)| {
                bencher.iter(|| aligner.align(a.as_view(), b.as_view()).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_pairwise(c: &mut Criterion) {
    let series: Vec<TimeSeries> = (0..50)
        .map(|i| make_sine_series(128, i as f64 * 0.2))
        .collect();
    let aligner = SeriesAligner::with_window(2);

    c.bench_function("pairwise_50x128_w2", |b| {
        b.iter(|| aligner.pairwise(&series).unwrap());
    });
}

fn bench_robust_align(c: &mut Criterion) {
    let a = make_sine_series(256, 0.0);
    let b = make_sine_series(256, 0.5);
    let config = RobustConfig::new(5, 3.0, 2.0).unwrap();
    let aligner = NoiseRobustAligner::new(config);

    c.bench_function("robust_align_256_w5", |bencher| {
        bencher.iter(|| aligner.align(a.as_view(), b.as_view()).unwrap());
    });
}

criterion_group!(benches, bench_align, bench_pairwise, bench_robust_align);
criterion_main!(benches);
