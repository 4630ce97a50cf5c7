//! Links Xcode releases to the restore image they require.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{RestoreImageRecord, XcodeVersionRecord};
use crate::notes_format::EncodedNotes;

/// Maps a macOS version string to a restore-image build number.
///
/// Every image registers its full version and its `major.minor` prefix. Entries are
/// inserted in iteration order, so a later image overwrites an earlier one that produced
/// the same key.
pub fn version_lookup(images: &[RestoreImageRecord]) -> HashMap<String, String> {
    let mut lookup = HashMap::with_capacity(images.len() * 2);
    for image in images {
        lookup.insert(image.version.clone(), image.build_number.clone());
        if let Some(short) = short_version(&image.version) {
            lookup.insert(short, image.build_number.clone());
        }
    }
    lookup
}

fn short_version(version: &str) -> Option<String> {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => Some(format!("{major}.{minor}")),
        _ => None,
    }
}

/// Sets `minimum_macos` from each record's encoded REQUIRES text and rewrites `notes` to
/// the bare release-notes URL (or clears it). Records whose requirement does not match a
/// known image keep `minimum_macos` unset.
pub fn resolve_minimum_macos(
    xcode_versions: Vec<XcodeVersionRecord>,
    images: &[RestoreImageRecord],
) -> Vec<XcodeVersionRecord> {
    let lookup = version_lookup(images);

    xcode_versions
        .into_iter()
        .map(|mut record| {
            let encoded = record
                .notes
                .as_deref()
                .map(EncodedNotes::parse)
                .unwrap_or_default();

            if let Some(build) = encoded
                .required_version()
                .and_then(|version| lookup.get(&version))
            {
                record.minimum_macos = Some(build.clone());
            } else if encoded.requires.is_some() {
                debug!(
                    xcode = %record.build_number,
                    requires = ?encoded.requires,
                    "[RESOLVE] No restore image matches Xcode requirement"
                );
            }

            record.notes = encoded.notes_url;
            record
        })
        .collect()
}
