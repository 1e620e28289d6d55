//! Tag filters evaluated against the inverted index
//!
//! A [`TagFilter`] selects index keys by a byte prefix (the common prefix
//! followed by the marshaled tag key) and a predicate over the tag value
//! that follows the prefix. A [`TagFilters`] collection holds the filters
//! of one query together with the common prefix they all share.
//!
//! # Example
//!
//! ```rust
//! use kuba_tagindex::filter::{SuffixMatcher, TagFilters};
//!
//! let mut tfs = TagFilters::new(Vec::new());
//! tfs.add(b"dc", SuffixMatcher::exact("us-east"), false);
//! tfs.add(b"env", SuffixMatcher::exact("staging"), true);
//! assert_eq!(tfs.len(), 2);
//! ```

use std::fmt;

use regex::bytes::Regex;

use crate::encoding::{tag_filter_prefix, unmarshal_tag_value};
use crate::error::{Error, Result};

/// Predicate applied to the unmarshaled tag value
#[derive(Debug, Clone)]
pub enum SuffixMatcher {
    /// Exact value match
    Exact(Vec<u8>),

    /// Value is one of the listed values
    OneOf(Vec<Vec<u8>>),

    /// Value starts with the given bytes
    Prefix(Vec<u8>),

    /// Anchored regular expression over the whole value
    Regex(Regex),

    /// Any value (the tag key exists)
    Any,
}

impl SuffixMatcher {
    /// Exact match
    pub fn exact(value: impl AsRef<[u8]>) -> Self {
        SuffixMatcher::Exact(value.as_ref().to_vec())
    }

    /// Match any of the given values
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        SuffixMatcher::OneOf(values.into_iter().map(|v| v.as_ref().to_vec()).collect())
    }

    /// Prefix match
    pub fn prefix(value: impl AsRef<[u8]>) -> Self {
        SuffixMatcher::Prefix(value.as_ref().to_vec())
    }

    /// Regex match; the pattern must match the whole value
    pub fn regex(pattern: &str) -> std::result::Result<Self, regex::Error> {
        let anchored = format!("^(?:{})$", pattern);
        Ok(SuffixMatcher::Regex(Regex::new(&anchored)?))
    }

    /// Check a raw tag value
    pub fn matches(&self, value: &[u8]) -> bool {
        match self {
            SuffixMatcher::Exact(v) => value == v.as_slice(),
            SuffixMatcher::OneOf(vs) => vs.iter().any(|v| value == v.as_slice()),
            SuffixMatcher::Prefix(p) => value.starts_with(p),
            SuffixMatcher::Regex(re) => re.is_match(value),
            SuffixMatcher::Any => true,
        }
    }
}

/// A single tag filter
#[derive(Debug, Clone)]
pub struct TagFilter {
    prefix: Vec<u8>,
    is_negative: bool,
    matcher: SuffixMatcher,
}

impl TagFilter {
    /// Build a filter for `tag_key` under `common_prefix`
    ///
    /// An empty `tag_key` filters on the metric group.
    pub fn new(
        common_prefix: &[u8],
        tag_key: &[u8],
        matcher: SuffixMatcher,
        is_negative: bool,
    ) -> Self {
        Self {
            prefix: tag_filter_prefix(common_prefix, tag_key),
            is_negative,
            matcher,
        }
    }

    /// Build a filter from an already marshaled prefix
    pub fn with_prefix(prefix: Vec<u8>, matcher: SuffixMatcher, is_negative: bool) -> Self {
        Self {
            prefix,
            is_negative,
            matcher,
        }
    }

    /// Full prefix, including the common prefix
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Whether matching keys are excluded rather than selected
    pub fn is_negative(&self) -> bool {
        self.is_negative
    }

    /// Evaluate the predicate against the marshaled remainder of an index
    /// key after the filter prefix
    ///
    /// `scratch` is cleared before use. A remainder that is not exactly one
    /// marshaled value is an internal error.
    pub fn match_suffix(&self, suffix: &[u8], scratch: &mut Vec<u8>) -> Result<bool> {
        scratch.clear();
        let tail = unmarshal_tag_value(scratch, suffix)?;
        if !tail.is_empty() {
            return Err(Error::Internal(format!(
                "unexpected {} trailing bytes after tag value in {:?}",
                tail.len(),
                suffix
            )));
        }
        let ok = self.matcher.matches(scratch);
        scratch.clear();
        Ok(ok)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.is_negative { "!" } else { "" };
        let prefix = String::from_utf8_lossy(&self.prefix);
        match &self.matcher {
            SuffixMatcher::Exact(v) => {
                write!(f, "{:?}{}={:?}", prefix, op, String::from_utf8_lossy(v))
            }
            SuffixMatcher::OneOf(vs) => {
                let parts: Vec<_> = vs.iter().map(|v| String::from_utf8_lossy(v)).collect();
                write!(f, "{:?}{}=({})", prefix, op, parts.join("|"))
            }
            SuffixMatcher::Prefix(p) => {
                write!(f, "{:?}{}={:?}*", prefix, op, String::from_utf8_lossy(p))
            }
            SuffixMatcher::Regex(re) => write!(f, "{:?}{}~{}", prefix, op, re.as_str()),
            SuffixMatcher::Any => write!(f, "{:?}{}=*", prefix, op),
        }
    }
}

/// Filters of one query plus their shared common prefix
#[derive(Debug, Clone, Default)]
pub struct TagFilters {
    common_prefix: Vec<u8>,
    filters: Vec<TagFilter>,
}

impl TagFilters {
    /// Create an empty collection
    pub fn new(common_prefix: Vec<u8>) -> Self {
        Self {
            common_prefix,
            filters: Vec::new(),
        }
    }

    /// Add a filter for `tag_key`, deriving its prefix from the common prefix
    pub fn add(&mut self, tag_key: &[u8], matcher: SuffixMatcher, is_negative: bool) -> &mut Self {
        let tf = TagFilter::new(&self.common_prefix, tag_key, matcher, is_negative);
        self.filters.push(tf);
        self
    }

    /// Add a prebuilt filter
    pub fn push(&mut self, filter: TagFilter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Shared prefix of every filter
    pub fn common_prefix(&self) -> &[u8] {
        &self.common_prefix
    }

    /// Filters in evaluation order
    pub fn filters(&self) -> &[TagFilter] {
        &self.filters
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if there are no filters
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Display for TagFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.filters.iter().map(|tf| tf.to_string()).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
