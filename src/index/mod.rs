//! In-memory inverted index for the metric catalog
//!
//! This module maps marshaled tag key/value pairs to the metric IDs that
//! carry them, absorbing recently ingested metrics before the durable index
//! can serve them.
//!
//! # Components
//!
//! - **table**: `IndexTable`, the tag pair -> posting set map and its scans
//! - **pending**: `PendingQueue` and the `MetadataResolver` contract
//! - **snapshot**: binary snapshot encoding of table and queue
//! - **inverted**: `InvertedIndex`, the locked, shareable index

pub mod inverted;
pub mod pending;
pub mod snapshot;
pub mod table;

// Re-export main types
pub use inverted::{IndexStats, IndexStatsSnapshot, InvertedIndex};
pub use pending::{DrainReport, MetadataResolver, PendingQueue, ResolveOutcome};
pub use table::IndexTable;
