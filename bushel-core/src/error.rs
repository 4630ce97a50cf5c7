use thiserror::Error;

use crate::model::EntityKind;

/// Failure of a single source fetch or verification call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("missing credential {0}")]
    MissingCredential(&'static str),
}

impl FetchError {
    pub fn decode(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of a whole [`crate::pipeline::Pipeline::fetch`] call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required source {source_id} failed while fetching {entity}: {error}")]
    SourceFailed {
        entity: EntityKind,
        source_id: String,
        #[source]
        error: FetchError,
    },
}

/// Boxed error returned by [`crate::contract::Publisher`] implementations.
pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while handing a [`crate::model::FetchResult`] to the publisher.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("publishing {kind} batch {batch} failed: {error}")]
    PublishFailed {
        kind: EntityKind,
        batch: usize,
        error: PublishError,
    },
}
