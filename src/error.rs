//! Error types for the tag index

use thiserror::Error;

use crate::types::{MetricId, TenantId};

/// Main error type for the tag index
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot buffer is truncated or malformed
    ///
    /// `section` names the part of the layout being decoded, `index` the
    /// entry within that section (if any), and `remaining` how many bytes
    /// were left unconsumed when decoding stopped.
    #[error(
        "Snapshot error in {section}{}: {message} ({remaining} bytes remaining)",
        fmt_index(.index)
    )]
    Snapshot {
        /// Layout section being decoded
        section: &'static str,
        /// Entry index within the section
        index: Option<usize>,
        /// Unconsumed bytes at the point of failure
        remaining: usize,
        /// Description of the violation
        message: String,
    },

    /// The metadata resolver failed for a reason other than "not yet available"
    ///
    /// This means the durable store is inconsistent and must be treated as
    /// unrecoverable by the caller.
    #[error("Cannot resolve metric name for metric_id={metric_id} tenant={tenant}: {source}")]
    Resolve {
        /// Metric being resolved
        metric_id: MetricId,
        /// Tenant owning the metric
        tenant: TenantId,
        /// Underlying resolver failure
        #[source]
        source: ResolverError,
    },

    /// Internal invariant violation (logic bug)
    #[error("BUG: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error indicates an inconsistency the process
    /// must not continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Resolve { .. } | Error::Internal(_))
    }

    pub(crate) fn snapshot(
        section: &'static str,
        index: Option<usize>,
        remaining: usize,
        message: impl Into<String>,
    ) -> Self {
        Error::Snapshot {
            section,
            index,
            remaining,
            message: message.into(),
        }
    }
}

fn fmt_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" #{}", i),
        None => String::new(),
    }
}

/// Failures reported by a [`MetadataResolver`](crate::index::MetadataResolver)
///
/// "Not yet available" is not an error; it is reported through
/// [`ResolveOutcome::NotYetAvailable`](crate::index::ResolveOutcome).
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The stored metric name cannot be decoded
    #[error("corrupted metric name: {0}")]
    CorruptName(String),

    /// Decoding the stored record failed
    #[error("decode error: {0}")]
    Decode(String),

    /// The backing store returned an error
    #[error("backend error: {0}")]
    Backend(String),
}

/// Decoding error carrying the unconsumed remainder of the input
///
/// Returned by snapshot deserialization so callers can inspect what was
/// left when decoding stopped.
#[derive(Debug)]
pub struct SnapshotError<'a> {
    /// The decoding error
    pub error: Error,
    /// Bytes not consumed when decoding stopped
    pub remainder: &'a [u8],
}

impl std::fmt::Display for SnapshotError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for SnapshotError<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
