//! Tag value marshaling used to build index keys
//!
//! Each tag component is written with three reserved bytes escaped and a
//! trailing separator:
//!
//! ```text
//! 0x00 -> 0x00 '0'
//! 0x01 -> 0x00 '1'
//! 0x02 -> 0x00 '2'
//! <value bytes> 0x01
//! ```
//!
//! An index key is `marshal(key) ++ marshal(value)`. The metric group is
//! stored under the empty tag key, so its key is `0x01 ++ marshal(group)`.
//! Filter prefixes are `common_prefix ++ marshal(tag_key)`; what remains of
//! an index key after the prefix is the marshaled value, which
//! [`unmarshal_tag_value`] turns back into raw bytes.

use crate::error::{Error, Result};
use crate::types::{MetricName, Tag};

/// Escape byte
pub const ESCAPE_CHAR: u8 = 0;
/// Terminates each marshaled tag component
pub const TAG_SEPARATOR_CHAR: u8 = 1;
/// Reserved key/value separator
pub const KV_SEPARATOR_CHAR: u8 = 2;

/// Append `src` to `dst` in marshaled form
pub fn marshal_tag_value(dst: &mut Vec<u8>, src: &[u8]) {
    if !src
        .iter()
        .any(|&b| b == ESCAPE_CHAR || b == TAG_SEPARATOR_CHAR || b == KV_SEPARATOR_CHAR)
    {
        dst.extend_from_slice(src);
        dst.push(TAG_SEPARATOR_CHAR);
        return;
    }
    for &b in src {
        match b {
            ESCAPE_CHAR => dst.extend_from_slice(&[ESCAPE_CHAR, b'0']),
            TAG_SEPARATOR_CHAR => dst.extend_from_slice(&[ESCAPE_CHAR, b'1']),
            KV_SEPARATOR_CHAR => dst.extend_from_slice(&[ESCAPE_CHAR, b'2']),
            _ => dst.push(b),
        }
    }
    dst.push(TAG_SEPARATOR_CHAR);
}

/// Decode one marshaled component from the front of `src` into `dst`
///
/// Returns the bytes following the separator.
pub fn unmarshal_tag_value<'a>(dst: &mut Vec<u8>, src: &'a [u8]) -> Result<&'a [u8]> {
    let end = src
        .iter()
        .position(|&b| b == TAG_SEPARATOR_CHAR)
        .ok_or_else(|| Error::Internal(format!("cannot find tag separator in {:?}", src)))?;
    let mut i = 0;
    let body = &src[..end];
    while i < body.len() {
        let b = body[i];
        if b != ESCAPE_CHAR {
            dst.push(b);
            i += 1;
            continue;
        }
        let decoded = match body.get(i + 1) {
            Some(b'0') => ESCAPE_CHAR,
            Some(b'1') => TAG_SEPARATOR_CHAR,
            Some(b'2') => KV_SEPARATOR_CHAR,
            Some(other) => {
                return Err(Error::Internal(format!(
                    "unsupported escape sequence 0x00 0x{:02x} in {:?}",
                    other, src
                )))
            }
            None => {
                return Err(Error::Internal(format!(
                    "truncated escape sequence in {:?}",
                    src
                )))
            }
        };
        dst.push(decoded);
        i += 2;
    }
    Ok(&src[end + 1..])
}

/// Append the index key for a tag
pub fn marshal_tag(dst: &mut Vec<u8>, tag: &Tag) {
    marshal_tag_value(dst, &tag.key);
    marshal_tag_value(dst, &tag.value);
}

/// Append the index key for the metric group pseudo-tag
pub fn marshal_metric_group(dst: &mut Vec<u8>, metric_group: &[u8]) {
    marshal_tag_value(dst, &[]);
    marshal_tag_value(dst, metric_group);
}

/// Build the filter prefix for a tag key under `common_prefix`
///
/// An empty `tag_key` selects the metric group.
pub fn tag_filter_prefix(common_prefix: &[u8], tag_key: &[u8]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(common_prefix.len() + tag_key.len() + 1);
    prefix.extend_from_slice(common_prefix);
    marshal_tag_value(&mut prefix, tag_key);
    prefix
}

/// Call `f` with every index key derived from `name`
///
/// The metric group key comes first, then one key per tag in stored
/// order. `buf` is scratch space and is cleared before each key.
pub fn for_each_index_key<F>(buf: &mut Vec<u8>, name: &MetricName, mut f: F)
where
    F: FnMut(&[u8]),
{
    buf.clear();
    marshal_metric_group(buf, &name.metric_group);
    f(buf);
    for tag in &name.tags {
        buf.clear();
        marshal_tag(buf, tag);
        f(buf);
    }
    buf.clear();
}
