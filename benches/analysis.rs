//! Benchmarks for a full rhythm analysis
//!
//! Run with: cargo bench --bench analysis

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rhythm_mapper::{AnalysisConfig, RhythmAnalyzer, SampleBuffer};
use std::f32::consts::PI;

/// Speech-like test signal: tone bursts every half second over a low hum
fn generate_test_signal(sample_rate: u32, duration_secs: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    let burst = sample_rate as usize / 10;
    let interval = sample_rate as usize / 2;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let hum = 0.05 * (2.0 * PI * 110.0 * t).sin();
            let burst_gain = if i % interval < burst { 0.6 } else { 0.0 };
            hum + burst_gain * (2.0 * PI * 880.0 * t).sin()
        })
        .collect()
}

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("rhythm_analysis");
    group.sample_size(10);

    let sample_rate = 22050;
    let buffer = SampleBuffer::new(generate_test_signal(sample_rate, 30.0), sample_rate).unwrap();
    group.throughput(Throughput::Elements(buffer.len() as u64));

    for parallel in [true, false] {
        let mut config = AnalysisConfig::default();
        config.parallel = parallel;
        let analyzer = RhythmAnalyzer::with_config(config);

        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::new("30s", label), &buffer, |b, buffer| {
            b.iter(|| black_box(analyzer.analyze(black_box(buffer)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_analysis);
criterion_main!(benches);
