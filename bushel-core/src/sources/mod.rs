//! Concrete [`crate::contract::RecordSource`] implementations, one module per origin.
//!
//! Every fetcher stamps its records with its own `SOURCE_ID`, which is also the id it is
//! registered under in [`crate::pipeline::Pipeline::standard`].

pub mod appledb;
pub mod ipsw;
pub mod mesu;
pub mod mrmacintosh;
pub mod swiftversion;
pub mod theapplewiki;
pub mod virtualbuddy;
pub mod xcodereleases;

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::FetchError;

pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    debug!(url, "[SOURCE] GET");
    let response = client.get(url).send().await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        source: e,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        source: e,
    })
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    let body = get_text(client, url).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::decode(url, e))
}

/// Version and build parsed from an Apple restore-image file name such as
/// `UniversalMac_14.2.1_23C71_Restore.ipsw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFileName {
    pub version: String,
    pub build_number: String,
}

pub fn parse_restore_file_name(url: &str) -> Option<RestoreFileName> {
    static FILE_NAME: OnceLock<Regex> = OnceLock::new();
    let re = FILE_NAME.get_or_init(|| {
        Regex::new(r"UniversalMac_(\d+(?:\.\d+)*)_([0-9]+[A-Z][0-9]+[a-z]?)_Restore\.ipsw")
            .expect("restore file name pattern is valid")
    });
    let captures = re.captures(url)?;
    Some(RestoreFileName {
        version: captures[1].to_string(),
        build_number: captures[2].to_string(),
    })
}

/// All `https://…UniversalMac_…_Restore.ipsw` links in a blob of HTML or wikitext, in
/// document order.
pub fn restore_image_links(text: &str) -> Vec<String> {
    static LINK: OnceLock<Regex> = OnceLock::new();
    let re = LINK.get_or_init(|| {
        Regex::new(r#"https?://[^\s"'<>\]|]+UniversalMac_[^\s"'<>\]|]+_Restore\.ipsw"#)
            .expect("restore link pattern is valid")
    });
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}
