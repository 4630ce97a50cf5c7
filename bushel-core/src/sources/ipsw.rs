//! Restore images from the ipsw.me firmware API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::get_text;
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "ipsw.me";

const DEVICE_URL: &str = "https://api.ipsw.me/v4/device/VirtualMac2,1?type=ipsw";

#[derive(Debug, Deserialize)]
struct Device {
    firmwares: Vec<Firmware>,
}

#[derive(Debug, Deserialize)]
struct Firmware {
    version: String,
    buildid: String,
    url: String,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    sha1sum: Option<String>,
    #[serde(default)]
    sha256sum: Option<String>,
    #[serde(default)]
    releasedate: Option<DateTime<Utc>>,
    #[serde(default)]
    uploaddate: Option<DateTime<Utc>>,
    #[serde(default)]
    signed: Option<bool>,
}

/// Parses the body of the ipsw.me device endpoint. Firmwares with neither a release nor
/// an upload date are skipped.
pub fn parse_device(body: &str) -> Result<Vec<RestoreImageRecord>, FetchError> {
    let device: Device =
        serde_json::from_str(body).map_err(|e| FetchError::decode("ipsw.me device", e))?;

    Ok(device
        .firmwares
        .into_iter()
        .filter_map(|fw| {
            let Some(release_date) = fw.releasedate.or(fw.uploaddate) else {
                debug!(build = %fw.buildid, "[SOURCE] ipsw.me firmware without date, skipping");
                return None;
            };
            Some(RestoreImageRecord {
                version: fw.version,
                build_number: fw.buildid,
                release_date,
                download_url: fw.url,
                file_size: fw.filesize.unwrap_or(0),
                sha256_hash: fw.sha256sum.unwrap_or_default().to_lowercase(),
                sha1_hash: fw.sha1sum.unwrap_or_default().to_lowercase(),
                is_signed: fw.signed,
                is_prerelease: false,
                source: SOURCE_ID.to_string(),
                notes: None,
                source_updated_at: None,
            })
        })
        .collect())
}

pub struct IpswFetcher {
    client: reqwest::Client,
}

impl IpswFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource<RestoreImageRecord> for IpswFetcher {
    async fn fetch(&self) -> Result<Vec<RestoreImageRecord>, FetchError> {
        let body = get_text(&self.client, DEVICE_URL).await?;
        parse_device(&body)
    }
}
