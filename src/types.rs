//! Core data types used throughout the tag index
//!
//! # Key Types
//!
//! - **`MetricId`**: Unique identifier for a metric (64-bit integer)
//! - **`TenantId`**: The (account, project) pair scoping metric ownership
//! - **`PendingEntry`**: A metric waiting for its name to become resolvable
//! - **`MetricName`**: Decoded metric group plus ordered tags
//!
//! # Example
//!
//! ```rust
//! use kuba_tagindex::types::{MetricName, PendingEntry, TenantId};
//!
//! let tenant = TenantId::new(1, 0);
//! let entry = PendingEntry::new(tenant, 42);
//! assert_eq!(entry.metric_id, 42);
//!
//! let name = MetricName::new("cpu_usage")
//!     .with_tag("host", "server1")
//!     .with_tag("dc", "us-east");
//! assert_eq!(name.tags.len(), 2);
//! ```

use std::fmt;

/// Unique identifier for a metric
pub type MetricId = u64;

/// Tenant identifier: (account, project)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId {
    /// Account identifier
    pub account_id: u32,
    /// Project identifier
    pub project_id: u32,
}

impl TenantId {
    /// Create a tenant identifier
    pub const fn new(account_id: u32, project_id: u32) -> Self {
        Self {
            account_id,
            project_id,
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account_id, self.project_id)
    }
}

/// A metric ingested but not yet indexed because its name could not be
/// retrieved at indexing time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingEntry {
    /// Owning tenant
    pub tenant: TenantId,
    /// Metric awaiting resolution
    pub metric_id: MetricId,
}

impl PendingEntry {
    /// In-memory footprint of one entry, used for size estimation
    pub const SIZE_BYTES: usize = 16;

    /// Create a pending entry
    pub const fn new(tenant: TenantId, metric_id: MetricId) -> Self {
        Self { tenant, metric_id }
    }
}

/// A single tag: key and value as raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    /// Tag key
    pub key: Vec<u8>,
    /// Tag value
    pub value: Vec<u8>,
}

impl Tag {
    /// Create a tag from anything byte-like
    pub fn new(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        }
    }
}

/// Decoded metric name: metric group plus tags in stored order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricName {
    /// Metric group (the `__name__` pseudo-tag)
    pub metric_group: Vec<u8>,
    /// Tags in stored order
    pub tags: Vec<Tag>,
}

impl MetricName {
    /// Create a metric name without tags
    pub fn new(metric_group: impl AsRef<[u8]>) -> Self {
        Self {
            metric_group: metric_group.as_ref().to_vec(),
            tags: Vec::new(),
        }
    }

    /// Append a tag
    #[must_use]
    pub fn with_tag(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }
}
