//! Snapshot format for the index table and pending queue
//!
//! All integers are big-endian.
//!
//! ```text
//! ┌────────────────────┐
//! │ entry count   u64  │
//! ├────────────────────┤  repeated entry count times
//! │ key length    u64  │
//! │ key bytes          │
//! │ posting count u64  │
//! │ metric IDs    u64* │
//! ├────────────────────┤
//! │ pending count u64  │
//! ├────────────────────┤  repeated pending count times
//! │ account ID    u32  │
//! │ project ID    u32  │
//! │ metric ID     u64  │
//! └────────────────────┘
//! ```
//!
//! There is no version field.

use bytes::{Buf, BufMut};

use crate::error::{Error, SnapshotError};
use crate::posting::PostingSet;
use crate::types::{PendingEntry, TenantId};

use super::pending::PendingQueue;
use super::table::IndexTable;

/// Size of one pending entry on the wire
const PENDING_ENTRY_WIRE_SIZE: usize = 16;

/// Append the snapshot of `table` and `pending` to `dst`
pub fn marshal(dst: &mut Vec<u8>, table: &IndexTable, pending: &PendingQueue) {
    dst.put_u64(table.unique_key_count() as u64);
    for (key, set) in table.iter() {
        dst.put_u64(key.len() as u64);
        dst.put_slice(key);
        dst.put_u64(set.len() as u64);
        for metric_id in set.iter() {
            dst.put_u64(metric_id);
        }
    }

    dst.put_u64(pending.len() as u64);
    for e in pending.entries() {
        dst.put_u32(e.tenant.account_id);
        dst.put_u32(e.tenant.project_id);
        dst.put_u64(e.metric_id);
    }
}

/// Decoded snapshot plus the bytes following it
pub type Unmarshaled<'a> = (IndexTable, PendingQueue, &'a [u8]);

/// Decode a snapshot from the front of `src`
///
/// Each length header is checked before its payload is read. On failure
/// the error names the section and entry being decoded, and carries the
/// bytes that were not consumed.
pub fn unmarshal(src: &[u8]) -> std::result::Result<Unmarshaled<'_>, SnapshotError<'_>> {
    let mut src = src;

    let entry_count = read_len(&mut src, "table.len", None)?;
    // Cap the preallocation; the header is untrusted.
    let mut table = IndexTable::with_capacity(entry_count.min(src.len() / 16));
    for i in 0..entry_count {
        let key_len = read_len(&mut src, "table.key", Some(i))?;
        if src.len() < key_len {
            return Err(fail(
                src,
                "table.key",
                Some(i),
                format!("want {} key bytes; got {} bytes", key_len, src.len()),
            ));
        }
        let key = src[..key_len].to_vec();
        src.advance(key_len);

        let posting_count = read_len(&mut src, "table.postings", Some(i))?;
        let want = posting_count.checked_mul(8).filter(|&n| n <= src.len());
        if want.is_none() {
            return Err(fail(
                src,
                "table.postings",
                Some(i),
                format!(
                    "not enough bytes for {} metric IDs; got {} bytes",
                    posting_count,
                    src.len()
                ),
            ));
        }
        let mut set = PostingSet::new();
        for _ in 0..posting_count {
            set.insert(src.get_u64());
        }
        table.insert_set(key, set);
    }

    let pending_count = read_len(&mut src, "pending.len", None)?;
    let want = pending_count
        .checked_mul(PENDING_ENTRY_WIRE_SIZE)
        .filter(|&n| n <= src.len());
    if want.is_none() {
        return Err(fail(
            src,
            "pending.entries",
            None,
            format!(
                "cannot read {} pending entries from {} bytes",
                pending_count,
                src.len()
            ),
        ));
    }
    let mut pending = PendingQueue::new();
    for _ in 0..pending_count {
        let account_id = src.get_u32();
        let project_id = src.get_u32();
        let metric_id = src.get_u64();
        pending.push(PendingEntry::new(TenantId::new(account_id, project_id), metric_id));
    }

    Ok((table, pending, src))
}

fn read_len<'a>(
    src: &mut &'a [u8],
    section: &'static str,
    index: Option<usize>,
) -> std::result::Result<usize, SnapshotError<'a>> {
    if src.len() < 8 {
        return Err(fail(
            *src,
            section,
            index,
            format!("want at least 8 bytes for length; got {} bytes", src.len()),
        ));
    }
    let n = src.get_u64();
    usize::try_from(n).map_err(|_| {
        fail(
            *src,
            section,
            index,
            format!("length {} does not fit in memory", n),
        )
    })
}

fn fail<'a>(
    remainder: &'a [u8],
    section: &'static str,
    index: Option<usize>,
    message: String,
) -> SnapshotError<'a> {
    SnapshotError {
        error: Error::snapshot(section, index, remainder.len(), message),
        remainder,
    }
}
