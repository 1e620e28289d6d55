//! Integration tests for the inverted index
//!
//! Covers filter evaluation semantics, pending resolution across drains,
//! and concurrent readers and writers on one shared index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use kuba_tagindex::config::Config;
use kuba_tagindex::filter::{SuffixMatcher, TagFilter, TagFilters};
use kuba_tagindex::index::{InvertedIndex, MetadataResolver, ResolveOutcome};
use kuba_tagindex::posting::PostingSet;
use kuba_tagindex::types::{MetricId, MetricName, PendingEntry, TenantId};
use kuba_tagindex::ResolverError;
use parking_lot::RwLock;

// =============================================================================
// Helpers
// =============================================================================

/// Resolver backed by a mutable map; missing IDs are "not yet available"
#[derive(Default)]
struct CatalogResolver {
    names: RwLock<HashMap<MetricId, MetricName>>,
}

impl CatalogResolver {
    fn publish(&self, metric_id: MetricId, name: MetricName) {
        self.names.write().insert(metric_id, name);
    }
}

impl MetadataResolver for CatalogResolver {
    fn resolve(
        &self,
        _tenant: TenantId,
        metric_id: MetricId,
    ) -> Result<ResolveOutcome, ResolverError> {
        Ok(match self.names.read().get(&metric_id) {
            Some(name) => ResolveOutcome::Found(name.clone()),
            None => ResolveOutcome::NotYetAvailable,
        })
    }
}

/// Resolver deriving tags from the metric ID itself
struct ShardResolver;

impl ShardResolver {
    fn shard(metric_id: MetricId) -> String {
        format!("s{}", metric_id % 4)
    }
}

impl MetadataResolver for ShardResolver {
    fn resolve(
        &self,
        _tenant: TenantId,
        metric_id: MetricId,
    ) -> Result<ResolveOutcome, ResolverError> {
        Ok(ResolveOutcome::Found(
            MetricName::new("requests").with_tag("shard", Self::shard(metric_id)),
        ))
    }
}

fn quiet_index() -> InvertedIndex {
    let mut config = Config::default();
    config.monitoring.metrics_enabled = false;
    InvertedIndex::from_config(&config)
}

fn tenant() -> TenantId {
    TenantId::new(1, 0)
}

fn ids(set: &PostingSet) -> Vec<MetricId> {
    set.to_vec()
}

fn evaluate(index: &InvertedIndex, tfs: &TagFilters, allowed: &PostingSet) -> PostingSet {
    let mut out = PostingSet::new();
    index
        .update_metric_ids_for_tag_filters(&mut out, allowed, tfs)
        .unwrap();
    out
}

// =============================================================================
// Filter evaluation
// =============================================================================

#[test]
fn test_one_of_filter_scenario() {
    let resolver = CatalogResolver::default();
    for id in [1, 2] {
        resolver.publish(id, MetricName::new("m").with_tag("tag1", "value1"));
    }
    resolver.publish(
        3,
        MetricName::new("m")
            .with_tag("tag1", "value1")
            .with_tag("tag1", "value2"),
    );
    resolver.publish(4, MetricName::new("m").with_tag("tag1", "value2"));

    let index = quiet_index();
    index.enqueue((1..=4).map(|id| PendingEntry::new(tenant(), id)));
    index.drain_and_resolve(&resolver).unwrap();

    let mut tfs = TagFilters::new(Vec::new());
    tfs.add(b"tag1", SuffixMatcher::one_of(["value1", "value2"]), false);
    let allowed: PostingSet = (1..=5).collect();

    assert_eq!(ids(&evaluate(&index, &tfs, &allowed)), vec![1, 2, 3, 4]);
}

#[test]
fn test_lookup_matches_exact_union() {
    let resolver = CatalogResolver::default();
    resolver.publish(1, MetricName::new("m").with_tag("dc", "us-east-1"));
    resolver.publish(2, MetricName::new("m").with_tag("dc", "us-east-2"));
    resolver.publish(3, MetricName::new("m").with_tag("dc", "eu-west-1"));
    resolver.publish(4, MetricName::new("m").with_tag("zone", "us-east-1"));

    let index = quiet_index();
    index.enqueue((1..=4).map(|id| PendingEntry::new(tenant(), id)));
    index.drain_and_resolve(&resolver).unwrap();

    let regex = TagFilter::new(b"", b"dc", SuffixMatcher::regex("us-.*").unwrap(), false);
    assert_eq!(ids(&index.lookup_for_filter(&regex, b"").unwrap()), vec![1, 2]);

    let prefix = TagFilter::new(b"", b"dc", SuffixMatcher::prefix("eu-"), false);
    assert_eq!(ids(&index.lookup_for_filter(&prefix, b"").unwrap()), vec![3]);

    let any = TagFilter::new(b"", b"dc", SuffixMatcher::Any, false);
    assert_eq!(ids(&index.lookup_for_filter(&any, b"").unwrap()), vec![1, 2, 3]);
}

#[test]
fn test_evaluation_is_independent_of_filter_order() {
    let resolver = CatalogResolver::default();
    // a: {1..=6}, b: {4..=9}, c: {5, 8}
    for id in 1..=10u64 {
        let mut name = MetricName::new("m");
        if (1..=6).contains(&id) {
            name = name.with_tag("a", "x");
        }
        if (4..=9).contains(&id) {
            name = name.with_tag("b", "y");
        }
        if id == 5 || id == 8 {
            name = name.with_tag("c", "z");
        }
        resolver.publish(id, name);
    }

    let index = quiet_index();
    index.enqueue((1..=10).map(|id| PendingEntry::new(tenant(), id)));
    index.drain_and_resolve(&resolver).unwrap();

    let f1 = (b"a", SuffixMatcher::exact("x"), false);
    let f2 = (b"b", SuffixMatcher::exact("y"), false);
    let f3 = (b"c", SuffixMatcher::exact("z"), true);
    let orders = [
        [&f1, &f2, &f3],
        [&f1, &f3, &f2],
        [&f2, &f1, &f3],
        [&f2, &f3, &f1],
        [&f3, &f1, &f2],
        [&f3, &f2, &f1],
    ];

    let allowed: PostingSet = (1..=10).collect();
    for order in orders {
        let mut tfs = TagFilters::new(Vec::new());
        for (key, matcher, negative) in order {
            tfs.add(*key, matcher.clone(), *negative);
        }
        assert_eq!(
            ids(&evaluate(&index, &tfs, &allowed)),
            vec![4, 6],
            "order: {}",
            tfs
        );
    }
}

#[test]
fn test_common_prefix_is_stripped() {
    let resolver = CatalogResolver::default();
    resolver.publish(1, MetricName::new("cpu").with_tag("host", "a"));
    resolver.publish(2, MetricName::new("cpu").with_tag("host", "b"));

    let index = quiet_index();
    index.enqueue([PendingEntry::new(tenant(), 1), PendingEntry::new(tenant(), 2)]);
    index.drain_and_resolve(&resolver).unwrap();

    let common = b"\x03\x00\x00\x00\x01".to_vec();
    let mut tfs = TagFilters::new(common);
    tfs.add(b"", SuffixMatcher::exact("cpu"), false)
        .add(b"host", SuffixMatcher::exact("a"), true);

    let allowed: PostingSet = [1, 2].into_iter().collect();
    assert_eq!(ids(&evaluate(&index, &tfs, &allowed)), vec![2]);
}

// =============================================================================
// Pending resolution
// =============================================================================

#[test]
fn test_unresolved_entry_is_retried_on_next_drain() {
    let resolver = CatalogResolver::default();
    let index = quiet_index();
    let entry = PendingEntry::new(tenant(), 42);

    index.add_metric_id(&resolver, entry).unwrap();
    assert_eq!(index.pending_entries(), vec![entry]);
    assert_eq!(index.unique_tag_pairs_len(), 0);

    resolver.publish(42, MetricName::new("disk").with_tag("dev", "sda"));
    let report = index.drain_and_resolve(&resolver).unwrap();
    assert_eq!(report.resolved, 1);
    assert_eq!(report.requeued, 0);
    assert_eq!(index.pending_len(), 0);

    let tf = TagFilter::new(b"", b"dev", SuffixMatcher::exact("sda"), false);
    assert_eq!(ids(&index.lookup_for_filter(&tf, b"").unwrap()), vec![42]);
    let group = TagFilter::new(b"", b"", SuffixMatcher::exact("disk"), false);
    assert_eq!(ids(&index.lookup_for_filter(&group, b"").unwrap()), vec![42]);
}

#[test]
fn test_pending_entries_survive_snapshot() {
    let resolver = CatalogResolver::default();
    resolver.publish(1, MetricName::new("up"));
    let index = quiet_index();
    index.enqueue([PendingEntry::new(tenant(), 1), PendingEntry::new(tenant(), 2)]);
    index.drain_and_resolve(&resolver).unwrap();

    let mut buf = Vec::new();
    index.marshal(&mut buf);
    let restored = quiet_index();
    restored.unmarshal(&buf).unwrap();
    assert_eq!(restored.pending_entries(), vec![PendingEntry::new(tenant(), 2)]);

    resolver.publish(2, MetricName::new("up"));
    restored.drain_and_resolve(&resolver).unwrap();
    let tf = TagFilter::new(b"", b"", SuffixMatcher::exact("up"), false);
    assert_eq!(ids(&restored.lookup_for_filter(&tf, b"").unwrap()), vec![1, 2]);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_readers_and_writers() {
    const WRITERS: u64 = 4;
    const PER_WRITER: u64 = 500;
    const READERS: usize = 4;

    let index = Arc::new(quiet_index());
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for r in 0..READERS {
        let index = Arc::clone(&index);
        let done = Arc::clone(&done);
        readers.push(thread::spawn(move || {
            let shard = ShardResolver::shard(r as u64);
            let mut tfs = TagFilters::new(Vec::new());
            tfs.add(b"shard", SuffixMatcher::exact(&shard), false);
            let allowed: PostingSet = (0..WRITERS * PER_WRITER).collect();
            let mut rounds = 0;
            while !done.load(Ordering::Acquire) || rounds == 0 {
                let mut out = PostingSet::new();
                index
                    .update_metric_ids_for_tag_filters(&mut out, &allowed, &tfs)
                    .unwrap();
                for id in out.iter() {
                    assert_eq!(ShardResolver::shard(id), shard);
                }
                rounds += 1;
            }
        }));
    }

    let mut writers = Vec::new();
    for w in 0..WRITERS {
        let index = Arc::clone(&index);
        writers.push(thread::spawn(move || {
            for i in 0..PER_WRITER {
                let id = w * PER_WRITER + i;
                index
                    .add_metric_id(&ShardResolver, PendingEntry::new(TenantId::new(0, 0), id))
                    .unwrap();
            }
        }));
    }

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for h in readers {
        h.join().unwrap();
    }

    // group key plus four shard keys
    assert_eq!(index.unique_tag_pairs_len(), 5);
    assert_eq!(index.entries_count() as u64, 2 * WRITERS * PER_WRITER);
    assert_eq!(index.pending_len(), 0);
}
