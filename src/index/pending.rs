//! Pending queue: metrics whose names were not yet resolvable
//!
//! Metric metadata may lag the inverted index by one flush cycle. Entries
//! that cannot be resolved yet stay queued and are retried on the next
//! drain; any other resolver failure aborts the drain.

use tracing::error;

use crate::encoding::for_each_index_key;
use crate::error::{Error, ResolverError, Result};
use crate::types::{MetricId, MetricName, PendingEntry, TenantId};

use super::table::IndexTable;

/// Result of a successful resolver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The decoded metric name
    Found(MetricName),
    /// The name is not stored yet; retry later
    NotYetAvailable,
}

/// Looks up decoded metric names in the durable index
///
/// Called while the index holds its exclusive lock, so implementations
/// must be fast local lookups.
pub trait MetadataResolver {
    /// Resolve the name of `metric_id` owned by `tenant`
    fn resolve(
        &self,
        tenant: TenantId,
        metric_id: MetricId,
    ) -> std::result::Result<ResolveOutcome, ResolverError>;
}

/// Counts from one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries resolved and added to the table
    pub resolved: usize,
    /// Entries put back because their names are not available yet
    pub requeued: usize,
}

/// Ordered list of entries awaiting resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingQueue {
    entries: Vec<PendingEntry>,
}

impl PendingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries
    pub fn enqueue<I: IntoIterator<Item = PendingEntry>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    /// Append one entry
    pub fn push(&mut self, entry: PendingEntry) {
        self.entries.push(entry);
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries in order
    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    /// Estimated memory footprint in bytes
    pub fn size_bytes(&self) -> usize {
        self.entries.len() * PendingEntry::SIZE_BYTES
    }

    /// Resolve every queued entry into `table`
    ///
    /// The current list is taken and replaced with an empty one; entries
    /// whose names are not yet available are pushed back onto it. On a
    /// resolver failure the drain stops and the error is returned; the
    /// failing entry and every entry after it are put back in order, so the
    /// queue never loses work.
    pub fn drain_into<R>(&mut self, table: &mut IndexTable, resolver: &R) -> Result<DrainReport>
    where
        R: MetadataResolver + ?Sized,
    {
        let entries = std::mem::take(&mut self.entries);
        let mut report = DrainReport::default();
        let mut key_buf = Vec::new();

        let mut remaining = entries.into_iter();
        while let Some(entry) = remaining.next() {
            let name = match resolver.resolve(entry.tenant, entry.metric_id) {
                Ok(ResolveOutcome::Found(name)) => name,
                Ok(ResolveOutcome::NotYetAvailable) => {
                    self.entries.push(entry);
                    report.requeued += 1;
                    continue;
                }
                Err(source) => {
                    error!(
                        metric_id = entry.metric_id,
                        tenant = %entry.tenant,
                        error = %source,
                        "Cannot resolve metric name for pending entry"
                    );
                    self.entries.push(entry);
                    self.entries.extend(remaining);
                    return Err(Error::Resolve {
                        metric_id: entry.metric_id,
                        tenant: entry.tenant,
                        source,
                    });
                }
            };

            for_each_index_key(&mut key_buf, &name, |key| table.add(key, entry.metric_id));
            report.resolved += 1;
        }

        Ok(report)
    }
}
