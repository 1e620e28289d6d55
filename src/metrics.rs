//! Prometheus metrics for the tag index
//!
//! Gauges mirror the index introspection counts; counters track drain
//! outcomes, filter scans and fatal errors.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder,
};

lazy_static! {
    // === Index Size Gauges ===

    /// Distinct tag key/value pairs
    pub static ref UNIQUE_TAG_PAIRS: IntGauge = register_int_gauge!(
        "tagindex_unique_tag_pairs",
        "Number of distinct tag key/value pairs in the index"
    ).unwrap();

    /// Sum of posting set sizes
    pub static ref POSTINGS: IntGauge = register_int_gauge!(
        "tagindex_postings",
        "Total number of (tag pair, metric ID) postings"
    ).unwrap();

    /// Entries waiting for their metric names
    pub static ref PENDING_ENTRIES: IntGauge = register_int_gauge!(
        "tagindex_pending_entries",
        "Number of metrics waiting for name resolution"
    ).unwrap();

    /// Estimated memory footprint
    pub static ref SIZE_BYTES: IntGauge = register_int_gauge!(
        "tagindex_size_bytes",
        "Estimated index size in bytes"
    ).unwrap();

    // === Operation Counters ===

    /// Pending entries resolved into the table
    pub static ref RESOLVED_TOTAL: IntCounter = register_int_counter!(
        "tagindex_resolved_total",
        "Pending entries resolved and indexed"
    ).unwrap();

    /// Pending entries requeued because their names were not available
    pub static ref REQUEUED_TOTAL: IntCounter = register_int_counter!(
        "tagindex_requeued_total",
        "Pending entries requeued for a later drain"
    ).unwrap();

    /// Full table scans performed for tag filters
    pub static ref FILTER_SCANS_TOTAL: IntCounter = register_int_counter!(
        "tagindex_filter_scans_total",
        "Table scans performed for tag filters"
    ).unwrap();

    /// Fatal errors (store corruption, invariant violations)
    pub static ref FATAL_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "tagindex_fatal_errors_total",
        "Fatal index errors"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Update the index size gauges
#[inline]
pub fn update_index_size(unique_tag_pairs: usize, postings: usize, pending: usize, bytes: usize) {
    UNIQUE_TAG_PAIRS.set(unique_tag_pairs as i64);
    POSTINGS.set(postings as i64);
    PENDING_ENTRIES.set(pending as i64);
    SIZE_BYTES.set(bytes as i64);
}

/// Record the outcome of a drain
#[inline]
pub fn record_drain(resolved: usize, requeued: usize) {
    RESOLVED_TOTAL.inc_by(resolved as u64);
    REQUEUED_TOTAL.inc_by(requeued as u64);
}

/// Record one table scan
#[inline]
pub fn record_filter_scan() {
    FILTER_SCANS_TOTAL.inc();
}

/// Record a fatal error
#[inline]
pub fn record_fatal_error() {
    FATAL_ERRORS_TOTAL.inc();
}
