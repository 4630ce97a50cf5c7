//! Restore images from The Apple Wiki's Mac firmware tables.
//!
//! Each major macOS release has its own wiki page. The page wikitext is fetched through
//! the MediaWiki `parse` API and split into table rows (`|-`); a row contributes a record
//! when it links a virtual-Mac restore image and carries an ISO release date.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use super::{get_text, parse_restore_file_name, restore_image_links};
use crate::contract::RecordSource;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "theapplewiki.com";

const API_URL: &str = "https://theapplewiki.com/api.php";
const DEFAULT_PAGES: &[&str] = &["Firmware/Mac/13.x", "Firmware/Mac/14.x", "Firmware/Mac/15.x"];

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: ParsedPage,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    wikitext: String,
}

fn row_date(row: &str) -> Option<DateTime<Utc>> {
    static ISO_DATE: OnceLock<Regex> = OnceLock::new();
    let re = ISO_DATE.get_or_init(|| {
        Regex::new(r"\b(\d{4})[-|](\d{1,2})[-|](\d{1,2})\b").expect("date pattern is valid")
    });
    let captures = re.captures(row)?;
    NaiveDate::from_ymd_opt(
        captures[1].parse().ok()?,
        captures[2].parse().ok()?,
        captures[3].parse().ok()?,
    )?
    .and_hms_opt(0, 0, 0)
    .map(|dt| dt.and_utc())
}

fn row_sha1(row: &str) -> Option<String> {
    static SHA1: OnceLock<Regex> = OnceLock::new();
    let re = SHA1.get_or_init(|| Regex::new(r"\b[0-9a-fA-F]{40}\b").expect("sha1 pattern is valid"));
    re.find(row).map(|m| m.as_str().to_lowercase())
}

fn row_file_size(row: &str) -> Option<u64> {
    static SIZE: OnceLock<Regex> = OnceLock::new();
    let re = SIZE.get_or_init(|| {
        Regex::new(r"(?m)^\|\s*(?:\{\{filesize\|)?(\d{8,})").expect("size pattern is valid")
    });
    re.captures(row).and_then(|c| c[1].parse().ok())
}

/// Parses the wikitext of one firmware page.
pub fn parse_wikitext(wikitext: &str) -> Vec<RestoreImageRecord> {
    wikitext
        .split("\n|-")
        .filter_map(|row| {
            let link = restore_image_links(row).into_iter().next()?;
            let file = parse_restore_file_name(&link)?;
            let release_date = row_date(row)?;
            let is_prerelease = file.build_number.ends_with(|c: char| c.is_ascii_lowercase());

            Some(RestoreImageRecord {
                version: file.version,
                build_number: file.build_number,
                release_date,
                download_url: link,
                file_size: row_file_size(row).unwrap_or(0),
                sha256_hash: String::new(),
                sha1_hash: row_sha1(row).unwrap_or_default(),
                is_signed: None,
                is_prerelease,
                source: SOURCE_ID.to_string(),
                notes: None,
                source_updated_at: None,
            })
        })
        .collect()
}

pub struct TheAppleWikiFetcher {
    client: reqwest::Client,
    pages: Vec<String>,
}

impl TheAppleWikiFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            pages: DEFAULT_PAGES.iter().map(|p| p.to_string()).collect(),
        }
    }

    async fn fetch_page(&self, page: &str) -> Result<Vec<RestoreImageRecord>, FetchError> {
        let url = format!(
            "{API_URL}?action=parse&prop=wikitext&format=json&formatversion=2&page={}",
            page.replace(' ', "_")
        );
        let body = get_text(&self.client, &url).await?;
        let response: ParseResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::decode(page, e))?;
        Ok(parse_wikitext(&response.parse.wikitext))
    }
}

#[async_trait]
impl RecordSource<RestoreImageRecord> for TheAppleWikiFetcher {
    /// Pages that fail are skipped; the fetch only fails when every page does.
    async fn fetch(&self) -> Result<Vec<RestoreImageRecord>, FetchError> {
        let mut records = Vec::new();
        let mut last_error = None;
        for page in &self.pages {
            match self.fetch_page(page).await {
                Ok(mut page_records) => records.append(&mut page_records),
                Err(e) => {
                    warn!(page = %page, error = %e, "[SOURCE] Wiki page fetch failed, skipping");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if records.is_empty() => Err(e),
            _ => Ok(records),
        }
    }
}
