//! HTTP implementation of [`Publisher`]: one `POST {endpoint}/{kind}` per batch.
//!
//! The request body is the bare JSON array of records and the store answers with
//! `{"accepted": n}`. Any non-success status fails the batch.

use async_trait::async_trait;
use bushel_core::contract::{Publisher, RecordBatch};
use bushel_core::PublishError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PublishResponse {
    accepted: usize,
}

pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpPublisher {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        tracing::info!(%endpoint, "Initialised HTTP publisher");
        Self {
            client,
            endpoint,
            token: token.into(),
        }
    }

    pub fn url_for(&self, batch: &RecordBatch) -> String {
        format!("{}/{}", self.endpoint, batch.kind())
    }
}

fn records_body(batch: &RecordBatch) -> serde_json::Result<serde_json::Value> {
    match batch {
        RecordBatch::SwiftVersions(records) => serde_json::to_value(records),
        RecordBatch::RestoreImages(records) => serde_json::to_value(records),
        RecordBatch::XcodeVersions(records) => serde_json::to_value(records),
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, batch: RecordBatch) -> Result<usize, PublishError> {
        let url = self.url_for(&batch);
        let body = records_body(&batch)?;
        tracing::debug!(%url, records = batch.len(), "Publishing batch");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, %url, "Publish request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%url, status = status.as_u16(), body = %text, "Store rejected batch");
            return Err(format!("{url} responded with HTTP {}: {text}", status.as_u16()).into());
        }

        let parsed: PublishResponse = response.json().await?;
        Ok(parsed.accepted)
    }
}
