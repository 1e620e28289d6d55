//! Posting sets: the metric IDs carrying one tag key/value pair
//!
//! Backed by a 64-bit roaring bitmap. Sets stored in the index are never
//! handed out by reference; callers always receive clones or freshly
//! built sets.

use roaring::RoaringTreemap;

use crate::types::MetricId;

/// Set of metric IDs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingSet {
    ids: RoaringTreemap,
}

impl PostingSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            ids: RoaringTreemap::new(),
        }
    }

    /// Add a metric ID; returns false if it was already present
    pub fn insert(&mut self, metric_id: MetricId) -> bool {
        self.ids.insert(metric_id)
    }

    /// Check membership
    pub fn contains(&self, metric_id: MetricId) -> bool {
        self.ids.contains(metric_id)
    }

    /// Number of metric IDs in the set
    pub fn len(&self) -> usize {
        self.ids.len() as usize
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// In-place union
    pub fn union_with(&mut self, other: &PostingSet) {
        self.ids |= &other.ids;
    }

    /// In-place intersection
    pub fn intersect_with(&mut self, other: &PostingSet) {
        self.ids &= &other.ids;
    }

    /// In-place difference (self AND NOT other)
    pub fn subtract(&mut self, other: &PostingSet) {
        self.ids -= &other.ids;
    }

    /// Iterate over metric IDs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = MetricId> + '_ {
        self.ids.iter()
    }

    /// Collect metric IDs in ascending order
    pub fn to_vec(&self) -> Vec<MetricId> {
        self.ids.iter().collect()
    }

    /// Estimated memory footprint in bytes
    pub fn size_bytes(&self) -> usize {
        self.ids.serialized_size()
    }
}

impl FromIterator<MetricId> for PostingSet {
    fn from_iter<I: IntoIterator<Item = MetricId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl Extend<MetricId> for PostingSet {
    fn extend<I: IntoIterator<Item = MetricId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}
