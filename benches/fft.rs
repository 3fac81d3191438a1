//! Benchmarks for one processing cycle at the default size

use clapsense::dsp::fft::FftEngine;
use clapsense::{ClapPipeline, DetectorConfig, SampleBuffer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn test_samples(n: usize) -> Vec<u16> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * 17.0 * i as f64 / n as f64;
            (2048.0 + 900.0 * phase.sin()) as u16
        })
        .collect()
}

fn bench_forward(c: &mut Criterion) {
    let n = clapsense::DEFAULT_SAMPLE_COUNT;
    let fft = FftEngine::new(n).unwrap();
    let samples = test_samples(n);

    c.bench_function("fft_forward_2048", |b| {
        b.iter(|| fft.forward(black_box(samples.as_slice())).unwrap())
    });
}

fn bench_cycle(c: &mut Criterion) {
    let mut pipeline = ClapPipeline::new(DetectorConfig::default()).unwrap();
    let buffer = SampleBuffer::new(test_samples(clapsense::DEFAULT_SAMPLE_COUNT)).unwrap();
    let mut now = 0u64;

    c.bench_function("pipeline_cycle_2048", |b| {
        b.iter(|| {
            now += 50_000;
            pipeline.process(black_box(&buffer), now).unwrap()
        })
    });
}

criterion_group!(benches, bench_forward, bench_cycle);
criterion_main!(benches);
