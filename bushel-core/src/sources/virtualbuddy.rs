//! Signing status from the VirtualBuddy TSS service, which asks Apple's signing server
//! directly and is therefore treated as authoritative.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::contract::SigningVerifier;
use crate::error::FetchError;
use crate::model::RestoreImageRecord;

pub const SOURCE_ID: &str = "tss.virtualbuddy.app";

const STATUS_URL: &str = "https://tss.virtualbuddy.app/v1/status";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub is_signed: Option<bool>,
}

impl StatusResponse {
    /// The signing answer for `build_number`, or `None` if the service answered for a
    /// different build or not at all.
    pub fn signing_for(&self, build_number: &str) -> Option<bool> {
        match self.build.as_deref() {
            Some(build) if build != build_number => None,
            _ => self.is_signed,
        }
    }
}

pub struct VirtualBuddyVerifier {
    client: reqwest::Client,
    api_key: String,
}

impl VirtualBuddyVerifier {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SigningVerifier for VirtualBuddyVerifier {
    async fn signing_status<'a>(
        &self,
        image: &'a RestoreImageRecord,
    ) -> Result<Option<bool>, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::MissingCredential("VIRTUALBUDDY_API_KEY"));
        }

        let response = self
            .client
            .get(STATUS_URL)
            .query(&[("apiKey", self.api_key.as_str()), ("ipsw", image.download_url.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: STATUS_URL.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: STATUS_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let body: StatusResponse = response.json().await.map_err(|e| FetchError::Http {
            url: STATUS_URL.to_string(),
            source: e,
        })?;
        let signed = body.signing_for(&image.build_number);
        debug!(build = %image.build_number, ?signed, "[SOURCE] VirtualBuddy signing status");
        Ok(signed)
    }
}
