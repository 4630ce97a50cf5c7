//! The restore image Apple's own software-update feed currently offers.
//!
//! The feed names exactly one image (the one being signed right now), so the fetcher
//! yields at most one record. The feed has no release date; the fetch time stands in for
//! both `release_date` and `source_updated_at`.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use super::get_text;
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "mesu.apple.com";

const FEED_URL: &str =
    "https://mesu.apple.com/assets/macos/com_apple_macOSIPSW/com_apple_macOSIPSW.xml";

fn plist_string(plist: &str, key: &str) -> Option<String> {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    let re = ENTRY.get_or_init(|| {
        Regex::new(r"<key>([A-Za-z0-9]+)</key>\s*<string>([^<]*)</string>")
            .expect("plist entry pattern is valid")
    });
    re.captures_iter(plist)
        .find(|c| &c[1] == key)
        .map(|c| c[2].trim().to_string())
}

/// Extracts the first restore entry from the feed. `Ok(None)` when the feed has no
/// complete entry.
pub fn parse_feed(
    plist: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Option<RestoreImageRecord>, FetchError> {
    if !plist.contains("<plist") {
        return Err(FetchError::decode("mesu feed", "response is not a property list"));
    }

    let (Some(build_number), Some(version), Some(download_url)) = (
        plist_string(plist, "BuildVersion"),
        plist_string(plist, "ProductVersion"),
        plist_string(plist, "FirmwareURL"),
    ) else {
        return Ok(None);
    };

    Ok(Some(RestoreImageRecord {
        version,
        build_number,
        release_date: fetched_at,
        download_url,
        file_size: 0,
        sha256_hash: String::new(),
        sha1_hash: plist_string(plist, "FirmwareSHA1")
            .unwrap_or_default()
            .to_lowercase(),
        is_signed: Some(true),
        is_prerelease: false,
        source: SOURCE_ID.to_string(),
        notes: None,
        source_updated_at: Some(fetched_at),
    }))
}

pub struct MesuFetcher {
    client: reqwest::Client,
}

impl MesuFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch_latest(&self) -> Result<Option<RestoreImageRecord>, FetchError> {
        let plist = get_text(&self.client, FEED_URL).await?;
        parse_feed(&plist, Utc::now())
    }
}

#[async_trait]
impl RecordSource<RestoreImageRecord> for MesuFetcher {
    async fn fetch(&self) -> Result<Vec<RestoreImageRecord>, FetchError> {
        Ok(self.fetch_latest().await?.into_iter().collect())
    }
}
