//! Record types shared by every stage of the pipeline.
//!
//! Each record type is keyed by a natural key (see [`RestoreImageRecord::key`] and friends):
//! two records with the same key describe the same real-world artifact, whichever source
//! reported them. Records are plain data; they are created fresh on every run and only ever
//! changed by the merge, enrichment and reference-resolution stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A macOS restore image (`.ipsw`) as reported by one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreImageRecord {
    pub version: String,
    pub build_number: String,
    pub release_date: DateTime<Utc>,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    /// Size in bytes; zero when the source does not report it.
    pub file_size: u64,
    /// Lowercase hex; empty when unknown.
    pub sha256_hash: String,
    /// Lowercase hex; empty when unknown.
    pub sha1_hash: String,
    /// `None` means the source did not say. Never treat it as `false`.
    pub is_signed: Option<bool>,
    pub is_prerelease: bool,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_updated_at: Option<DateTime<Utc>>,
}

impl RestoreImageRecord {
    pub fn key(&self) -> &str {
        &self.build_number
    }
}

/// An Xcode release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XcodeVersionRecord {
    pub version: String,
    pub build_number: String,
    pub release_date: DateTime<Utc>,
    #[serde(rename = "downloadURL", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub is_prerelease: bool,
    /// Build number of the restore image this Xcode requires at minimum.
    #[serde(rename = "minimumMacOS", default, skip_serializing_if = "Option::is_none")]
    pub minimum_macos: Option<String>,
    /// Version string of the bundled Swift compiler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_swift_version: Option<String>,
    /// Before reference resolution this may hold the `REQUIRES:`/`NOTES_URL:` encoding
    /// produced by the fetcher; afterwards it is the release-notes URL or nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl XcodeVersionRecord {
    pub fn key(&self) -> &str {
        &self.build_number
    }
}

/// A Swift compiler release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftVersionRecord {
    pub version: String,
    pub release_date: DateTime<Utc>,
    #[serde(rename = "downloadURL", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub is_prerelease: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SwiftVersionRecord {
    pub fn key(&self) -> &str {
        &self.version
    }
}

/// The three entity types the pipeline aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    RestoreImages,
    XcodeVersions,
    SwiftVersions,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::RestoreImages => "restore-images",
            EntityKind::XcodeVersions => "xcode-versions",
            EntityKind::SwiftVersions => "swift-versions",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one pipeline run produced, deduplicated and resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub restore_images: Vec<RestoreImageRecord>,
    pub xcode_versions: Vec<XcodeVersionRecord>,
    pub swift_versions: Vec<SwiftVersionRecord>,
}

impl FetchResult {
    pub fn total(&self) -> usize {
        self.restore_images.len() + self.xcode_versions.len() + self.swift_versions.len()
    }
}
