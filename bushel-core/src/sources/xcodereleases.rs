//! Xcode releases from xcodereleases.com.
//!
//! The minimum macOS requirement and the release-notes link are not resolved here; they
//! travel to [`crate::references`] in the record's `notes`, encoded with
//! [`EncodedNotes`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::get_text;
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::XcodeVersionRecord;
use crate::notes_format::EncodedNotes;

pub const SOURCE_ID: &str = "xcodereleases.com";

const DATA_URL: &str = "https://xcodereleases.com/data.json";

#[derive(Debug, Deserialize)]
struct Release {
    name: String,
    version: Version,
    date: ReleaseDate,
    #[serde(default)]
    requires: Option<String>,
    #[serde(default)]
    compilers: Option<Compilers>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Version {
    number: String,
    #[serde(default)]
    build: Option<String>,
    /// One of `{"release": true}`, `{"beta": 2}`, `{"rc": 1}`, `{"gm": true}`, ...
    #[serde(default)]
    release: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDate {
    year: i32,
    month: u32,
    day: u32,
}

#[derive(Debug, Deserialize)]
struct Compilers {
    #[serde(default)]
    swift: Vec<Compiler>,
}

#[derive(Debug, Deserialize)]
struct Compiler {
    number: String,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    download: Option<Link>,
    #[serde(default)]
    notes: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    url: String,
}

fn is_final(release: &BTreeMap<String, Value>) -> bool {
    release.contains_key("release") || release.contains_key("gm")
}

fn display_version(version: &Version) -> String {
    let stage = [("beta", "Beta"), ("rc", "RC"), ("dp", "DP"), ("gmSeed", "GM Seed")]
        .into_iter()
        .find_map(|(key, label)| version.release.get(key).map(|v| (label, v.as_u64())));
    match stage {
        Some((label, Some(n))) if n > 0 => format!("{} {label} {n}", version.number),
        Some((label, _)) => format!("{} {label}", version.number),
        None => version.number.clone(),
    }
}

fn to_utc(date: &ReleaseDate) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(date.year, date.month, date.day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Parses `data.json`. Entries that are not Xcode, or lack a build number or a valid
/// date, are skipped.
pub fn parse_releases(body: &str) -> Result<Vec<XcodeVersionRecord>, FetchError> {
    let releases: Vec<Release> =
        serde_json::from_str(body).map_err(|e| FetchError::decode("xcodereleases data.json", e))?;

    Ok(releases
        .into_iter()
        .filter(|r| r.name == "Xcode")
        .filter_map(|release| {
            let build_number = release.version.build.clone()?;
            let release_date = to_utc(&release.date)?;
            let links = release.links.as_ref();
            let notes = EncodedNotes {
                requires: release.requires.as_ref().map(|r| format!("macOS {r}")),
                notes_url: links.and_then(|l| l.notes.as_ref()).map(|l| l.url.clone()),
            };

            Some(XcodeVersionRecord {
                version: display_version(&release.version),
                build_number,
                release_date,
                download_url: links.and_then(|l| l.download.as_ref()).map(|l| l.url.clone()),
                file_size: None,
                is_prerelease: !is_final(&release.version.release),
                minimum_macos: None,
                included_swift_version: release
                    .compilers
                    .as_ref()
                    .and_then(|c| c.swift.first())
                    .map(|c| c.number.clone()),
                notes: notes.encode(),
            })
        })
        .collect())
}

pub struct XcodeReleasesFetcher {
    client: reqwest::Client,
}

impl XcodeReleasesFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource<XcodeVersionRecord> for XcodeReleasesFetcher {
    async fn fetch(&self) -> Result<Vec<XcodeVersionRecord>, FetchError> {
        let body = get_text(&self.client, DATA_URL).await?;
        parse_releases(&body)
    }
}
