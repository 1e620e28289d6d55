//! Pending Queue Drain Benchmarks
//!
//! Measures resolution of pending entries into the table, with and
//! without entries that have to be requeued.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use kuba_tagindex::config::Config;
use kuba_tagindex::index::{InvertedIndex, MetadataResolver, ResolveOutcome};
use kuba_tagindex::types::{MetricId, MetricName, PendingEntry, TenantId};
use kuba_tagindex::ResolverError;
use std::hint::black_box;

/// Resolves every ID except multiples of `lag_every`
struct Lagging {
    lag_every: u64,
}

impl MetadataResolver for Lagging {
    fn resolve(&self, _: TenantId, id: MetricId) -> Result<ResolveOutcome, ResolverError> {
        if self.lag_every > 0 && id % self.lag_every == 0 {
            return Ok(ResolveOutcome::NotYetAvailable);
        }
        Ok(ResolveOutcome::Found(
            MetricName::new("cpu_seconds_total")
                .with_tag("instance", format!("10.0.{}.{}", id / 256 % 256, id % 256))
                .with_tag("mode", if id % 2 == 0 { "user" } else { "system" }),
        ))
    }
}

fn fresh_index(entries: u64) -> InvertedIndex {
    let mut config = Config::default();
    config.monitoring.metrics_enabled = false;
    let index = InvertedIndex::from_config(&config);
    index.enqueue((0..entries).map(|id| PendingEntry::new(TenantId::new(1, 1), id)));
    index
}

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_and_resolve");

    for entries in [1_000u64, 10_000] {
        group.throughput(Throughput::Elements(entries));
        for lag_every in [0u64, 10] {
            let resolver = Lagging { lag_every };
            group.bench_with_input(
                BenchmarkId::new(format!("lag_every_{}", lag_every), entries),
                &entries,
                |b, &entries| {
                    b.iter_batched(
                        || fresh_index(entries),
                        |index| black_box(index.drain_and_resolve(&resolver).unwrap()),
                        BatchSize::LargeInput,
                    )
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_drain);
criterion_main!(benches);
