use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use iscc_eval::{Bits, Fingerprint, GroundTruthIndex, MatchConfig, Matcher, evaluate};

/// xorshift64, so every run benchmarks the same index.
fn next(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

/// `clusters` queries with four near-duplicates each, plus as many distractors.
fn synthetic_index(clusters: usize) -> GroundTruthIndex {
    let mut state = 0x9e37_79b9_7f4a_7c15;
    let mut index = GroundTruthIndex::new(Bits::B64, None);
    for _ in 0..clusters {
        let query = next(&mut state);
        let members = (0..4)
            .map(|i| Fingerprint::from_lanes(&[query ^ (1 << (i * 7))]).unwrap())
            .collect();
        index
            .insert_cluster(Fingerprint::from_lanes(&[query]).unwrap(), members)
            .unwrap();
        index
            .push_distractor(Fingerprint::from_lanes(&[next(&mut state)]).unwrap())
            .unwrap();
    }
    index
}

fn bench_match_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_all");
    for clusters in [100usize, 500, 1000] {
        let index = synthetic_index(clusters);
        let matcher = Matcher::new(&index);
        group.throughput(Throughput::Elements(clusters as u64));

        for parallel in [false, true] {
            let cfg = MatchConfig {
                threshold: 8,
                parallel,
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, clusters), &cfg, |b, cfg| {
                b.iter(|| black_box(matcher.match_all(cfg).unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let index = synthetic_index(1000);
    let results = Matcher::new(&index)
        .match_all(&MatchConfig::default())
        .unwrap();
    c.bench_function("evaluate_1000_queries", |b| {
        b.iter(|| black_box(evaluate(&index, &results).unwrap()))
    });
}

criterion_group!(benches, bench_match_all, bench_evaluate);
criterion_main!(benches);
