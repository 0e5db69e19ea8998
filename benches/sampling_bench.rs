//! Criterion benchmarks for the data and sampling hot paths.
//!
//! Run with: `cargo bench --bench sampling_bench`
//!
//! ## Benchmarks
//!
//! 1. **Batch sampling**: one-hot windows for a training batch
//! 2. **Inverse-CDF sampling**: picking a character from a distribution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nnplay::data::{CharBatchSampler, Corpus, SampleConfig};
use nnplay::generation::sample_index;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_corpus(len: usize) -> Corpus {
    let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyz .,\n".chars().collect();
    let mut rng = StdRng::seed_from_u64(42);
    let text: String = (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect();
    Corpus::from_text(&text)
}

fn bench_next_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_batch");
    for &batch_size in &[10usize, 100] {
        let mut sampler = CharBatchSampler::new(
            synthetic_corpus(100_000),
            SampleConfig::new(32, batch_size),
        )
        .expect("sampler");
        let mut rng = StdRng::seed_from_u64(123_456_789);
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| black_box(sampler.next_batch(&mut rng)));
        });
    }
    group.finish();
}

fn bench_sample_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_index");
    for &k in &[30usize, 100, 300] {
        #[allow(clippy::cast_precision_loss)]
        let dist = vec![1.0 / k as f32; k];
        let mut rng = StdRng::seed_from_u64(34_352_442);
        group.bench_with_input(BenchmarkId::from_parameter(k), &dist, |b, dist| {
            b.iter(|| black_box(sample_index(dist, rng.gen())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_next_batch, bench_sample_index);
criterion_main!(benches);
