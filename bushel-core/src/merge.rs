//! Field-level reconciliation of two restore-image records that share a build number.
//!
//! [`merge_restore_images`] is not symmetric: `first` supplies every field that has no
//! explicit rule below and wins some tie-breaks, so callers pass records in discovery
//! order.
//!
//! | field                    | rule                                                  |
//! |--------------------------|-------------------------------------------------------|
//! | `sha256_hash`, `sha1_hash` | backfilled from `second` when `first` is empty      |
//! | `file_size`              | backfilled from `second` when `first` is zero         |
//! | `notes`                  | `"<first>; <second>"`, or whichever side is non-empty |
//! | `is_signed`              | see [`resolve_signing`]                               |
//! | everything else          | `first`                                               |

use crate::model::RestoreImageRecord;

/// Sources whose signing claims override every other source regardless of recency.
pub const AUTHORITATIVE_SIGNING_SOURCES: &[&str] = &["mesu.apple.com", "tss.virtualbuddy.app"];

pub fn is_authoritative(source: &str) -> bool {
    AUTHORITATIVE_SIGNING_SOURCES.contains(&source)
}

pub fn merge_restore_images(
    first: &RestoreImageRecord,
    second: &RestoreImageRecord,
) -> RestoreImageRecord {
    let mut merged = first.clone();

    if merged.sha256_hash.is_empty() && !second.sha256_hash.is_empty() {
        merged.sha256_hash = second.sha256_hash.clone();
    }
    if merged.sha1_hash.is_empty() && !second.sha1_hash.is_empty() {
        merged.sha1_hash = second.sha1_hash.clone();
    }
    if merged.file_size == 0 && second.file_size > 0 {
        merged.file_size = second.file_size;
    }

    merged.notes = merge_notes(first.notes.as_deref(), second.notes.as_deref());
    merged.is_signed = resolve_signing(first, second);
    merged
}

fn merge_notes(first: Option<&str>, second: Option<&str>) -> Option<String> {
    let first = first.filter(|n| !n.is_empty());
    let second = second.filter(|n| !n.is_empty());
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

/// Decides the signing status of a merged record.
///
/// 1. A known value from an authoritative source wins (`first` is checked before `second`).
/// 2. Otherwise the side with the strictly later `source_updated_at` wins.
/// 3. Otherwise a side that has a timestamp beats one that does not.
/// 4. Otherwise two known, disagreeing values resolve to `false`.
///
/// In steps 2 and 3 an unknown winner falls back to the other side's value.
pub fn resolve_signing(first: &RestoreImageRecord, second: &RestoreImageRecord) -> Option<bool> {
    for record in [first, second] {
        if is_authoritative(&record.source) && record.is_signed.is_some() {
            return record.is_signed;
        }
    }

    match (first.source_updated_at, second.source_updated_at) {
        (Some(a), Some(b)) if a > b => first.is_signed.or(second.is_signed),
        (Some(a), Some(b)) if b > a => second.is_signed.or(first.is_signed),
        (Some(_), None) => first.is_signed.or(second.is_signed),
        (None, Some(_)) => second.is_signed.or(first.is_signed),
        // No timestamps at all, or identical ones.
        _ => match (first.is_signed, second.is_signed) {
            (Some(a), Some(b)) if a != b => Some(false),
            (a, b) => a.or(b),
        },
    }
}
