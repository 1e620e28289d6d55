//! Index table: marshaled tag key/value -> posting set
//!
//! The table is not synchronized on its own; [`InvertedIndex`] owns it
//! behind a single table-wide lock.
//!
//! [`InvertedIndex`]: super::InvertedIndex

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::filter::TagFilter;
use crate::posting::PostingSet;
use crate::types::MetricId;

/// Mapping from marshaled tag key/value to the metric IDs carrying it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexTable {
    entries: HashMap<Vec<u8>, PostingSet>,
}

impl IndexTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Add `metric_id` under `key`, creating the posting set if absent
    pub fn add(&mut self, key: &[u8], metric_id: MetricId) {
        match self.entries.get_mut(key) {
            Some(set) => {
                set.insert(metric_id);
            }
            None => {
                let mut set = PostingSet::new();
                set.insert(metric_id);
                self.entries.insert(key.to_vec(), set);
            }
        }
    }

    /// Insert a complete posting set under `key`, replacing any existing one
    pub(crate) fn insert_set(&mut self, key: Vec<u8>, set: PostingSet) {
        self.entries.insert(key, set);
    }


    /// Union of the posting sets of every key the filter accepts
    ///
    /// Scans all keys. A key is considered when it starts with the filter
    /// prefix stripped of `common_prefix`; the remaining bytes go to the
    /// filter predicate. Returns an error if the filter prefix does not
    /// start with `common_prefix` or a key remainder is malformed; both
    /// indicate a bug.
    pub fn lookup_for_filter(
        &self,
        filter: &TagFilter,
        common_prefix: &[u8],
    ) -> Result<PostingSet> {
        let prefix = filter.prefix().strip_prefix(common_prefix).ok_or_else(|| {
            Error::Internal(format!(
                "tag filter prefix must start with common prefix {:?}; got {:?}",
                common_prefix,
                filter.prefix()
            ))
        })?;

        let mut result = PostingSet::new();
        let mut scratch = Vec::new();
        for (key, set) in &self.entries {
            let Some(suffix) = key.strip_prefix(prefix) else {
                continue;
            };
            if filter.match_suffix(suffix, &mut scratch)? {
                result.union_with(set);
            }
        }
        Ok(result)
    }

    /// Iterate over (key, posting set) pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &PostingSet)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Number of distinct keys
    pub fn unique_key_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all posting set cardinalities
    pub fn total_posting_count(&self) -> usize {
        self.entries.values().map(PostingSet::len).sum()
    }

    /// Key bytes plus posting set size estimates
    pub fn estimated_size_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| k.len() + v.size_bytes())
            .sum()
    }

    /// Check if the table has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
