//! Engine micro-benchmarks: store throughput, keyword query latency, and
//! HNSW search latency at a few index sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use engram_core::{
    DistanceMetric, EntryInput, HnswConfig, HnswIndex, MemoryConfig, MemoryQuery, MemoryStore,
    Quantization,
};

fn bench_store(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(MemoryConfig::for_project(dir.path())).unwrap();

    let mut i = 0u64;
    c.bench_function("store_entry", |b| {
        b.iter(|| {
            i += 1;
            store
                .store(EntryInput::new(
                    "bench",
                    format!("key-{i}"),
                    "the quick brown fox jumps over the lazy dog",
                ))
                .unwrap()
        })
    });
}

fn bench_keyword_query(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(MemoryConfig::for_project(dir.path())).unwrap();
    for i in 0..1000 {
        store
            .store(EntryInput::new(
                "bench",
                format!("key-{i}"),
                format!("entry {i} about tokens caching and retrieval"),
            ))
            .unwrap();
    }

    c.bench_function("keyword_query_1k", |b| {
        b.iter(|| store.query(&MemoryQuery::keyword("caching")).unwrap())
    });
}

fn bench_hnsw_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search");
    for &size in &[100usize, 1000, 5000] {
        let index = HnswIndex::new(HnswConfig {
            dimensions: 64,
            metric: DistanceMetric::Cosine,
            quantization: Quantization::None,
            max_elements: size + 1,
            ..Default::default()
        });
        for i in 0..size {
            let v: Vec<f32> = (0..64).map(|d| ((i * 31 + d) as f32 * 0.1).sin()).collect();
            index.add_point(&format!("p{i}"), &v).unwrap();
        }
        let query: Vec<f32> = (0..64).map(|d| (d as f32 * 0.1).cos()).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| index.search(&query, 10, None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_store, bench_keyword_query, bench_hnsw_search);
criterion_main!(benches);
