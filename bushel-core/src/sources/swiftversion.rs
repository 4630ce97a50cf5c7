//! Swift compiler releases scraped from swiftversion.net.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use super::get_text;
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::SwiftVersionRecord;

pub const SOURCE_ID: &str = "swiftversion.net";

const PAGE_URL: &str = "https://swiftversion.net/";

fn cells(row: &str) -> Vec<String> {
    static CELL: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    let cell = CELL.get_or_init(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("cell pattern is valid"));
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
    cell.captures_iter(row)
        .map(|c| tag.replace_all(&c[1], "").trim().to_string())
        .collect()
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    ["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%d %b %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn is_version(text: &str) -> bool {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("version pattern is valid"))
        .is_match(text)
}

/// Parses the release table: each row needs a date cell followed by the Swift version
/// cell (the Xcode column that follows is ignored).
pub fn parse_page(html: &str) -> Vec<SwiftVersionRecord> {
    html.split("<tr")
        .skip(1)
        .filter_map(|row| {
            let cells = cells(row);
            let date_index = cells.iter().position(|c| parse_date(c).is_some())?;
            let release_date = parse_date(&cells[date_index])?;
            let version = cells[date_index + 1..].iter().find(|c| is_version(c))?;
            Some(SwiftVersionRecord {
                version: version.clone(),
                release_date,
                download_url: None,
                is_prerelease: false,
                notes: None,
            })
        })
        .collect()
}

pub struct SwiftVersionFetcher {
    client: reqwest::Client,
}

impl SwiftVersionFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource<SwiftVersionRecord> for SwiftVersionFetcher {
    async fn fetch(&self) -> Result<Vec<SwiftVersionRecord>, FetchError> {
        let html = get_text(&self.client, PAGE_URL).await?;
        let records = parse_page(&html);
        if records.is_empty() {
            return Err(FetchError::decode("swiftversion.net", "no release rows found"));
        }
        Ok(records)
    }
}
