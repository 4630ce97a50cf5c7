//! Hands a [`FetchResult`] to the remote store.
//!
//! Records are published in dependency order: Swift versions, then restore images, then
//! Xcode versions (an Xcode record references both of the others). Each collection is
//! split into [`RecordBatch`]es of at most `batch_size` records.
//!
//! # Responsibilities
//! - Fail fast: the first rejected batch stops the run; batches already accepted stay.
//! - Dry run: nothing is sent, the report shows what would have been.
//! - Delivery guarantees (retries, idempotent upserts) belong to the [`Publisher`].

use tracing::{error, info};

use crate::contract::{Publisher, RecordBatch};
use crate::error::SyncError;
use crate::model::{EntityKind, FetchResult};

pub const DEFAULT_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    pub kinds: Vec<KindReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    pub kind: EntityKind,
    pub records: usize,
    pub batches: usize,
    /// Records the store reported as accepted; zero on a dry run.
    pub accepted: usize,
}

impl SyncReport {
    pub fn kind(&self, kind: EntityKind) -> Option<&KindReport> {
        self.kinds.iter().find(|k| k.kind == kind)
    }
}

/// Splits the result into batches in publish order.
pub fn plan_batches(result: &FetchResult, batch_size: usize) -> Vec<RecordBatch> {
    let size = batch_size.max(1);
    let swift = result
        .swift_versions
        .chunks(size)
        .map(|c| RecordBatch::SwiftVersions(c.to_vec()));
    let images = result
        .restore_images
        .chunks(size)
        .map(|c| RecordBatch::RestoreImages(c.to_vec()));
    let xcode = result
        .xcode_versions
        .chunks(size)
        .map(|c| RecordBatch::XcodeVersions(c.to_vec()));
    swift.chain(images).chain(xcode).collect()
}

pub async fn synchronise<P>(
    result: &FetchResult,
    publisher: &P,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    P: Publisher + ?Sized,
{
    info!(
        dry_run = options.dry_run,
        batch_size = options.batch_size,
        records = result.total(),
        "[SYNC] Starting synchronisation"
    );

    let mut kinds: Vec<KindReport> = [
        (EntityKind::SwiftVersions, result.swift_versions.len()),
        (EntityKind::RestoreImages, result.restore_images.len()),
        (EntityKind::XcodeVersions, result.xcode_versions.len()),
    ]
    .into_iter()
    .map(|(kind, records)| KindReport {
        kind,
        records,
        batches: 0,
        accepted: 0,
    })
    .collect();

    for batch in plan_batches(result, options.batch_size) {
        let kind = batch.kind();
        let len = batch.len();
        let Some(report) = kinds.iter_mut().find(|k| k.kind == kind) else {
            continue;
        };
        report.batches += 1;
        let batch_number = report.batches;

        if options.dry_run {
            info!(%kind, batch = batch_number, records = len, "[SYNC][DRY-RUN] Would publish batch");
            continue;
        }

        match publisher.publish(batch).await {
            Ok(accepted) => {
                info!(%kind, batch = batch_number, records = len, accepted, "[SYNC] Published batch");
                report.accepted += accepted;
            }
            Err(e) => {
                error!(%kind, batch = batch_number, error = %e, "[SYNC][ERROR] Publishing batch failed");
                return Err(SyncError::PublishFailed {
                    kind,
                    batch: batch_number,
                    error: e,
                });
            }
        }
    }

    for report in &kinds {
        info!(
            kind = %report.kind,
            records = report.records,
            batches = report.batches,
            accepted = report.accepted,
            "[SYNC] Kind complete"
        );
    }

    Ok(SyncReport {
        dry_run: options.dry_run,
        kinds,
    })
}
