//! Beta and release-candidate restore images from the Mr. Macintosh IPSW database page.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use super::{get_text, parse_restore_file_name, restore_image_links};
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "mrmacintosh.com";

const DATABASE_URL: &str =
    "https://mrmacintosh.com/apple-silicon-m1-full-macos-restore-ipsw-firmware-files-database/";

/// First `M/D/YY` or `M/D/YYYY` date in `text`.
fn row_date(text: &str) -> Option<DateTime<Utc>> {
    static DATE: OnceLock<Regex> = OnceLock::new();
    let re = DATE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("date pattern is valid")
    });
    let captures = re.captures(text)?;
    let month: u32 = captures[1].parse().ok()?;
    let day: u32 = captures[2].parse().ok()?;
    let mut year: i32 = captures[3].parse().ok()?;
    if captures[3].len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Parses the database page. Each table row that links a restore image and carries a
/// date becomes one record; signing status is not published on the page.
pub fn parse_database(html: &str) -> Vec<RestoreImageRecord> {
    html.split("<tr")
        .skip(1)
        .filter_map(|row| {
            let link = restore_image_links(row).into_iter().next()?;
            let file = parse_restore_file_name(&link)?;
            let release_date = row_date(row)?;
            let lowered = row.to_lowercase();
            let is_prerelease = lowered.contains("beta")
                || lowered.contains(" rc")
                || file.build_number.ends_with(|c: char| c.is_ascii_lowercase());

            Some(RestoreImageRecord {
                version: file.version,
                build_number: file.build_number,
                release_date,
                download_url: link,
                file_size: 0,
                sha256_hash: String::new(),
                sha1_hash: String::new(),
                is_signed: None,
                is_prerelease,
                source: SOURCE_ID.to_string(),
                notes: None,
                source_updated_at: None,
            })
        })
        .collect()
}

pub struct MrMacintoshFetcher {
    client: reqwest::Client,
}

impl MrMacintoshFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource<RestoreImageRecord> for MrMacintoshFetcher {
    async fn fetch(&self) -> Result<Vec<RestoreImageRecord>, FetchError> {
        let html = get_text(&self.client, DATABASE_URL).await?;
        let records = parse_database(&html);
        if records.is_empty() {
            return Err(FetchError::decode(
                "mrmacintosh database",
                "no restore image rows found",
            ));
        }
        Ok(records)
    }
}
