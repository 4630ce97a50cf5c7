//! Restore images from AppleDB.
//!
//! AppleDB records carry no per-entry timestamp, so every record is stamped with the date
//! of the last upstream commit touching the macOS data. If that lookup fails the records
//! are still returned, just without `source_updated_at`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{get_json, get_text};
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "appledb.dev";

const MAIN_URL: &str = "https://api.appledb.dev/ios/macOS/main.json";
const COMMITS_URL: &str =
    "https://api.github.com/repos/littlebyteorg/appledb/commits?path=osFiles/macOS&per_page=1";
const VIRTUAL_MAC: &str = "VirtualMac2,1";

#[derive(Debug, Deserialize)]
struct Release {
    version: String,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    released: Option<String>,
    #[serde(default)]
    beta: bool,
    #[serde(default)]
    rc: bool,
    #[serde(default)]
    signed: Value,
    #[serde(default)]
    sources: Vec<ReleaseSource>,
}

#[derive(Debug, Deserialize)]
struct ReleaseSource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "deviceMap")]
    device_map: Vec<String>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    hashes: Hashes,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Link {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Hashes {
    #[serde(rename = "sha2-256")]
    sha256: Option<String>,
    sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Committer,
}

#[derive(Debug, Deserialize)]
struct Committer {
    date: DateTime<Utc>,
}

fn signing_for_virtual_mac(signed: &Value) -> Option<bool> {
    match signed {
        Value::Bool(flag) => Some(*flag),
        Value::Array(devices) => Some(devices.iter().any(|d| d.as_str() == Some(VIRTUAL_MAC))),
        _ => None,
    }
}

fn parse_released(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parses AppleDB's macOS `main.json`. Only releases with an `ipsw` source that targets
/// the virtual Mac, a build number and a full release date are kept.
pub fn parse_main(
    body: &str,
    source_updated_at: Option<DateTime<Utc>>,
) -> Result<Vec<RestoreImageRecord>, FetchError> {
    let releases: Vec<Release> =
        serde_json::from_str(body).map_err(|e| FetchError::decode("appledb main.json", e))?;

    let mut records = Vec::new();
    for release in releases {
        let Some(build_number) = release.build.clone() else {
            continue;
        };
        let Some(release_date) = release.released.as_deref().and_then(parse_released) else {
            debug!(build = %build_number, "[SOURCE] appledb release without full date, skipping");
            continue;
        };
        let Some(ipsw) = release
            .sources
            .iter()
            .find(|s| s.kind == "ipsw" && s.device_map.iter().any(|d| d == VIRTUAL_MAC))
        else {
            continue;
        };
        let Some(link) = ipsw.links.first() else {
            continue;
        };

        let is_prerelease = release.beta
            || release.rc
            || build_number.ends_with(|c: char| c.is_ascii_lowercase());

        records.push(RestoreImageRecord {
            version: release.version.clone(),
            build_number,
            release_date,
            download_url: link.url.clone(),
            file_size: ipsw.size.unwrap_or(0),
            sha256_hash: ipsw.hashes.sha256.clone().unwrap_or_default().to_lowercase(),
            sha1_hash: ipsw.hashes.sha1.clone().unwrap_or_default().to_lowercase(),
            is_signed: signing_for_virtual_mac(&release.signed),
            is_prerelease,
            source: SOURCE_ID.to_string(),
            notes: None,
            source_updated_at,
        });
    }
    Ok(records)
}

pub struct AppleDbFetcher {
    client: reqwest::Client,
}

impl AppleDbFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn last_updated(&self) -> Option<DateTime<Utc>> {
        match get_json::<Vec<Commit>>(&self.client, COMMITS_URL).await {
            Ok(commits) => commits.first().map(|c| c.commit.committer.date),
            Err(e) => {
                warn!(error = %e, "[SOURCE] Could not read AppleDB commit date");
                None
            }
        }
    }
}

#[async_trait]
impl RecordSource<RestoreImageRecord> for AppleDbFetcher {
    async fn fetch(&self) -> Result<Vec<RestoreImageRecord>, FetchError> {
        let body = get_text(&self.client, MAIN_URL).await?;
        let updated_at = self.last_updated().await;
        parse_main(&body, updated_at)
    }
}
