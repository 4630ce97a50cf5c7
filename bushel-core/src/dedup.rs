//! Collapse records of one entity type to one record per natural key.
//!
//! Restore images fold duplicates through [`merge_restore_images`]; Xcode and Swift
//! records keep the first one seen and drop the rest. All three return newest first,
//! with ties left in first-seen order.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::merge::merge_restore_images;
use crate::model::{RestoreImageRecord, SwiftVersionRecord, XcodeVersionRecord};

pub fn deduplicate_restore_images(records: Vec<RestoreImageRecord>) -> Vec<RestoreImageRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<RestoreImageRecord> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(record.key()).copied() {
            Some(slot) => {
                let merged = merge_restore_images(&unique[slot], &record);
                unique[slot] = merged;
            }
            None => {
                index.insert(record.key().to_string(), unique.len());
                unique.push(record);
            }
        }
    }

    newest_first(unique, |r| r.release_date)
}

pub fn deduplicate_xcode_versions(records: Vec<XcodeVersionRecord>) -> Vec<XcodeVersionRecord> {
    let unique = first_wins(records, |r| r.key().to_string());
    newest_first(unique, |r| r.release_date)
}

pub fn deduplicate_swift_versions(records: Vec<SwiftVersionRecord>) -> Vec<SwiftVersionRecord> {
    let unique = first_wins(records, |r| r.key().to_string());
    newest_first(unique, |r| r.release_date)
}

fn first_wins<T>(records: Vec<T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(key(record)))
        .collect()
}

fn newest_first<T>(mut records: Vec<T>, date: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    // `sort_by` is stable.
    records.sort_by(|a, b| date(b).cmp(&date(a)));
    records
}
