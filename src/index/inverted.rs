//! Lock-owning inverted index
//!
//! [`InvertedIndex`] owns the [`IndexTable`] and [`PendingQueue`] behind a
//! single `RwLock`. Queries and introspection take the shared lock;
//! ingestion, draining and snapshot restore take the exclusive lock.
//!
//! # Example
//!
//! ```rust
//! use kuba_tagindex::filter::{SuffixMatcher, TagFilters};
//! use kuba_tagindex::index::{InvertedIndex, MetadataResolver, ResolveOutcome};
//! use kuba_tagindex::posting::PostingSet;
//! use kuba_tagindex::types::{MetricId, MetricName, PendingEntry, TenantId};
//! use kuba_tagindex::ResolverError;
//!
//! struct Names;
//!
//! impl MetadataResolver for Names {
//!     fn resolve(&self, _: TenantId, id: MetricId) -> Result<ResolveOutcome, ResolverError> {
//!         let host = if id % 2 == 0 { "even" } else { "odd" };
//!         Ok(ResolveOutcome::Found(MetricName::new("cpu").with_tag("host", host)))
//!     }
//! }
//!
//! let index = InvertedIndex::new();
//! let tenant = TenantId::new(0, 0);
//! for id in 1..=4 {
//!     index.add_metric_id(&Names, PendingEntry::new(tenant, id)).unwrap();
//! }
//!
//! let mut tfs = TagFilters::new(Vec::new());
//! tfs.add(b"host", SuffixMatcher::exact("even"), false);
//!
//! let allowed: PostingSet = (1..=4).collect();
//! let mut result = PostingSet::new();
//! index.update_metric_ids_for_tag_filters(&mut result, &allowed, &tfs).unwrap();
//! assert_eq!(result.to_vec(), vec![2, 4]);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result, SnapshotError};
use crate::filter::{TagFilter, TagFilters};
use crate::metrics;
use crate::posting::PostingSet;
use crate::types::{PendingEntry, TenantId};

use super::pending::{DrainReport, MetadataResolver, PendingQueue};
use super::snapshot;
use super::table::IndexTable;

/// State guarded by the index lock
#[derive(Debug, Default)]
struct Inner {
    table: IndexTable,
    pending: PendingQueue,
}

/// Operation counters for the inverted index
#[derive(Debug, Default)]
pub struct IndexStats {
    /// Table scans performed for tag filters
    pub filter_scans: AtomicU64,

    /// Tag filter evaluations
    pub evaluations: AtomicU64,

    /// Drain passes
    pub drains: AtomicU64,

    /// Pending entries resolved
    pub resolved: AtomicU64,

    /// Pending entries requeued
    pub requeued: AtomicU64,
}

impl IndexStats {
    /// Get a snapshot of statistics
    pub fn snapshot(&self) -> IndexStatsSnapshot {
        IndexStatsSnapshot {
            filter_scans: self.filter_scans.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of index statistics (non-atomic copy)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStatsSnapshot {
    /// Table scans performed for tag filters
    pub filter_scans: u64,
    /// Tag filter evaluations
    pub evaluations: u64,
    /// Drain passes
    pub drains: u64,
    /// Pending entries resolved
    pub resolved: u64,
    /// Pending entries requeued
    pub requeued: u64,
}

/// In-memory inverted index of tag key/value pairs to metric IDs
#[derive(Debug)]
pub struct InvertedIndex {
    inner: RwLock<Inner>,
    stats: IndexStats,
    pending_warn_threshold: usize,
    metrics_enabled: bool,
}

impl InvertedIndex {
    /// Create an empty index with default configuration
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Create an empty index from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            inner: RwLock::new(Inner {
                table: IndexTable::with_capacity(config.index.initial_capacity),
                pending: PendingQueue::new(),
            }),
            stats: IndexStats::default(),
            pending_warn_threshold: config.index.pending_warn_threshold,
            metrics_enabled: config.monitoring.metrics_enabled,
        }
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Queue entries without resolving them
    pub fn enqueue<I: IntoIterator<Item = PendingEntry>>(&self, entries: I) {
        self.inner.write().pending.enqueue(entries);
    }

    /// Resolve all pending entries into the table
    ///
    /// Entries whose names are not available yet stay queued. Any other
    /// resolver failure is returned as a fatal error.
    pub fn drain_and_resolve<R>(&self, resolver: &R) -> Result<DrainReport>
    where
        R: MetadataResolver + ?Sized,
    {
        let mut inner = self.inner.write();
        self.drain_locked(&mut inner, resolver)
    }

    /// Queue a single entry and drain
    pub fn add_metric_id<R>(&self, resolver: &R, entry: PendingEntry) -> Result<DrainReport>
    where
        R: MetadataResolver + ?Sized,
    {
        let mut inner = self.inner.write();
        inner.pending.push(entry);
        self.drain_locked(&mut inner, resolver)
    }

    /// Queue every metric ID of every tenant and drain
    pub fn update_by_tenant<R>(
        &self,
        resolver: &R,
        by_tenant: &HashMap<TenantId, PostingSet>,
    ) -> Result<DrainReport>
    where
        R: MetadataResolver + ?Sized,
    {
        let mut entries = Vec::with_capacity(by_tenant.values().map(PostingSet::len).sum());
        for (tenant, ids) in by_tenant {
            entries.extend(ids.iter().map(|id| PendingEntry::new(*tenant, id)));
        }

        let mut inner = self.inner.write();
        inner.pending.enqueue(entries);
        self.drain_locked(&mut inner, resolver)
    }

    fn drain_locked<R>(&self, inner: &mut Inner, resolver: &R) -> Result<DrainReport>
    where
        R: MetadataResolver + ?Sized,
    {
        let Inner { table, pending } = inner;
        let report = pending.drain_into(table, resolver).map_err(|e| self.fatal(e))?;

        self.stats.drains.fetch_add(1, Ordering::Relaxed);
        self.stats
            .resolved
            .fetch_add(report.resolved as u64, Ordering::Relaxed);
        self.stats
            .requeued
            .fetch_add(report.requeued as u64, Ordering::Relaxed);
        if self.metrics_enabled {
            metrics::record_drain(report.resolved, report.requeued);
        }

        debug!(
            resolved = report.resolved,
            requeued = report.requeued,
            "Drained pending entries"
        );
        if self.pending_warn_threshold > 0 && pending.len() > self.pending_warn_threshold {
            warn!(
                pending = pending.len(),
                threshold = self.pending_warn_threshold,
                "Pending queue exceeds threshold; metric names are lagging"
            );
        }
        Ok(report)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Union of the posting sets of every key `filter` accepts
    pub fn lookup_for_filter(
        &self,
        filter: &TagFilter,
        common_prefix: &[u8],
    ) -> Result<PostingSet> {
        let inner = self.inner.read();
        self.scan(&inner.table, filter, common_prefix)
    }

    /// Add the metric IDs matching `tfs` within `allowed` to `metric_ids`
    ///
    /// The first non-negative filter seeds the result, intersected with
    /// `allowed`; without one, the seed is `allowed` itself. Remaining
    /// filters are intersected in or, if negative, subtracted. Evaluation
    /// stops as soon as the running result is empty. Existing contents of
    /// `metric_ids` are kept.
    pub fn update_metric_ids_for_tag_filters(
        &self,
        metric_ids: &mut PostingSet,
        allowed: &PostingSet,
        tfs: &TagFilters,
    ) -> Result<()> {
        self.stats.evaluations.fetch_add(1, Ordering::Relaxed);
        let filters = tfs.filters();
        let common_prefix = tfs.common_prefix();
        let seed = filters.iter().position(|tf| !tf.is_negative());

        let inner = self.inner.read();
        let mut result = match seed {
            None => allowed.clone(),
            Some(i) => {
                let mut m = self.scan(&inner.table, &filters[i], common_prefix)?;
                // Tag values do not encode tenant membership.
                m.intersect_with(allowed);
                m
            }
        };
        if result.is_empty() {
            return Ok(());
        }

        for (i, tf) in filters.iter().enumerate() {
            if Some(i) == seed {
                continue;
            }
            let m = self.scan(&inner.table, tf, common_prefix)?;
            if tf.is_negative() {
                result.subtract(&m);
            } else {
                result.intersect_with(&m);
            }
            if result.is_empty() {
                return Ok(());
            }
        }
        drop(inner);

        metric_ids.union_with(&result);
        Ok(())
    }

    fn scan(
        &self,
        table: &IndexTable,
        filter: &TagFilter,
        common_prefix: &[u8],
    ) -> Result<PostingSet> {
        self.stats.filter_scans.fetch_add(1, Ordering::Relaxed);
        if self.metrics_enabled {
            metrics::record_filter_scan();
        }
        table
            .lookup_for_filter(filter, common_prefix)
            .map_err(|e| self.fatal(e))
    }

    fn fatal(&self, err: Error) -> Error {
        if err.is_fatal() {
            error!(error = %err, "FATAL: inverted index inconsistency");
            if self.metrics_enabled {
                metrics::record_fatal_error();
            }
        }
        err
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Append a snapshot of the table and pending queue to `dst`
    pub fn marshal(&self, dst: &mut Vec<u8>) {
        let inner = self.inner.read();
        snapshot::marshal(dst, &inner.table, &inner.pending);
    }

    /// Replace the table and pending queue with the snapshot at the front
    /// of `src`, returning the bytes after it
    ///
    /// On error the index is left unchanged.
    pub fn unmarshal<'a>(&self, src: &'a [u8]) -> std::result::Result<&'a [u8], SnapshotError<'a>> {
        let (table, pending, tail) = snapshot::unmarshal(src)?;
        let mut inner = self.inner.write();
        inner.table = table;
        inner.pending = pending;
        info!(
            unique_tag_pairs = inner.table.unique_key_count(),
            pending = inner.pending.len(),
            "Restored inverted index from snapshot"
        );
        Ok(tail)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of distinct tag key/value pairs
    pub fn unique_tag_pairs_len(&self) -> usize {
        self.inner.read().table.unique_key_count()
    }

    /// Total (tag pair, metric ID) postings
    pub fn entries_count(&self) -> usize {
        self.inner.read().table.total_posting_count()
    }

    /// Number of entries waiting for resolution
    pub fn pending_len(&self) -> usize {
        self.inner.read().pending.len()
    }

    /// Clone of the pending entries in queue order
    pub fn pending_entries(&self) -> Vec<PendingEntry> {
        self.inner.read().pending.entries().to_vec()
    }

    /// Estimated memory footprint of the table and pending queue
    pub fn size_bytes(&self) -> usize {
        let inner = self.inner.read();
        inner.table.estimated_size_bytes() + inner.pending.size_bytes()
    }

    /// Operation counters
    pub fn stats(&self) -> IndexStatsSnapshot {
        self.stats.snapshot()
    }

    /// Push the current sizes to the Prometheus gauges
    pub fn publish_metrics(&self) {
        if !self.metrics_enabled {
            return;
        }
        let inner = self.inner.read();
        metrics::update_index_size(
            inner.table.unique_key_count(),
            inner.table.total_posting_count(),
            inner.pending.len(),
            inner.table.estimated_size_bytes() + inner.pending.size_bytes(),
        );
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}
