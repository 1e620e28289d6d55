//! Kuba Tag Index - in-memory inverted index for the metric catalog
//!
//! This library provides the secondary index that answers "which metrics
//! match these tag filters" for recently ingested metrics:
//! - Tag key/value -> metric ID posting sets
//! - A pending queue that tolerates metric names not yet being resolvable
//! - Tag filter evaluation by prefix-scoped set intersection and subtraction
//! - A binary snapshot format for save and restore

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod filter;
pub mod index;
pub mod posting;
pub mod types;

/// Prometheus metrics for index size and operations
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Tracing subscriber setup
pub mod logging;

// Re-export main types
pub use config::Config;
pub use error::{Error, ResolverError, Result, SnapshotError};
pub use filter::{SuffixMatcher, TagFilter, TagFilters};
pub use index::{InvertedIndex, MetadataResolver, ResolveOutcome};
pub use posting::PostingSet;
pub use types::{MetricId, MetricName, PendingEntry, Tag, TenantId};
