//! # contract: the seams between the pipeline and the outside world
//!
//! The pipeline never talks HTTP directly. It talks to:
//!
//! - [`RecordSource`]: one origin that yields records of one entity type;
//! - [`SigningVerifier`]: a privileged service that knows whether Apple still signs an image;
//! - [`Publisher`]: the remote store that receives the final, deduplicated records.
//!
//! Concrete sources live in [`crate::sources`]; the HTTP publisher lives in the CLI crate.
//! Every trait is annotated for `mockall`, so tests (and downstream crates with the
//! `test-export-mocks` feature) get `MockRecordSource`, `MockSigningVerifier` and
//! `MockPublisher` for free.

use async_trait::async_trait;
use serde::Serialize;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{FetchError, PublishError};
use crate::model::{EntityKind, RestoreImageRecord, SwiftVersionRecord, XcodeVersionRecord};

/// One origin of records of type `T`.
///
/// A failed fetch returns an error and nothing else; the pipeline decides from the
/// source's registered policy whether that error is fatal.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource<T: Send + Sync + 'static>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<T>, FetchError>;
}

/// Authoritative signing status lookup for a single restore image.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SigningVerifier: Send + Sync {
    /// `Ok(None)` when the verifier has no answer for this image.
    async fn signing_status<'a>(
        &self,
        image: &'a RestoreImageRecord,
    ) -> Result<Option<bool>, FetchError>;
}

/// A homogeneous chunk of records handed to the publisher in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "records", rename_all = "kebab-case")]
pub enum RecordBatch {
    SwiftVersions(Vec<SwiftVersionRecord>),
    RestoreImages(Vec<RestoreImageRecord>),
    XcodeVersions(Vec<XcodeVersionRecord>),
}

impl RecordBatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordBatch::SwiftVersions(_) => EntityKind::SwiftVersions,
            RecordBatch::RestoreImages(_) => EntityKind::RestoreImages,
            RecordBatch::XcodeVersions(_) => EntityKind::XcodeVersions,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordBatch::SwiftVersions(records) => records.len(),
            RecordBatch::RestoreImages(records) => records.len(),
            RecordBatch::XcodeVersions(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The remote store.
///
/// Implementations own transport, authentication and retries. Batches arrive in
/// dependency order (Swift versions, then restore images, then Xcode versions).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Upserts every record in `batch`, returning how many the store accepted.
    async fn publish(&self, batch: RecordBatch) -> Result<usize, PublishError>;
}
