//! Fetch orchestration: gathers every entity type from its registered sources and turns
//! the raw records into one deduplicated, resolved [`FetchResult`].
//!
//! # Flow
//! 1. Restore images: every enabled source in registration order, then
//!    [`deduplicate_restore_images`], then optional signing enrichment.
//! 2. Xcode versions: fetch, [`deduplicate_xcode_versions`], then
//!    [`resolve_minimum_macos`] against the restore images from step 1.
//! 3. Swift versions: fetch, [`deduplicate_swift_versions`].
//!
//! # Failure policy
//! Each source is registered with a [`FetchPolicy`]. A `BestEffort` source that fails is
//! logged and contributes nothing; a `Required` source that fails aborts the whole call
//! with [`PipelineError::SourceFailed`]. Signing enrichment never fails the call.
//!
//! Registration order matters: merged restore images take their base fields from the
//! source that reported them first.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::FetchOptions;
use crate::contract::{RecordSource, SigningVerifier};
use crate::dedup::{deduplicate_restore_images, deduplicate_swift_versions, deduplicate_xcode_versions};
use crate::error::PipelineError;
use crate::gate::{AlwaysFetch, FetchGate};
use crate::merge::merge_restore_images;
use crate::model::{
    EntityKind, FetchResult, RestoreImageRecord, SwiftVersionRecord, XcodeVersionRecord,
};
use crate::references::resolve_minimum_macos;
use crate::sources::{
    appledb::AppleDbFetcher, ipsw::IpswFetcher, mesu::MesuFetcher, mrmacintosh::MrMacintoshFetcher,
    swiftversion::SwiftVersionFetcher, theapplewiki::TheAppleWikiFetcher,
    virtualbuddy::VirtualBuddyVerifier, xcodereleases::XcodeReleasesFetcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Failure aborts the fetch.
    Required,
    /// Failure is logged and the source contributes no records.
    BestEffort,
}

/// Which inclusion toggle in [`FetchOptions`] governs a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceGroup {
    Primary,
    Beta,
    CommunityWiki,
}

pub struct RegisteredSource<T: Send + Sync + 'static> {
    pub id: String,
    pub policy: FetchPolicy,
    pub group: SourceGroup,
    pub source: Arc<dyn RecordSource<T>>,
}

impl<T: Send + Sync + 'static> RegisteredSource<T> {
    pub fn new(
        id: impl Into<String>,
        policy: FetchPolicy,
        group: SourceGroup,
        source: impl RecordSource<T> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            policy,
            group,
            source: Arc::new(source),
        }
    }
}

struct RegisteredVerifier {
    id: String,
    verifier: Arc<dyn SigningVerifier>,
}

pub struct Pipeline {
    restore_image_sources: Vec<RegisteredSource<RestoreImageRecord>>,
    xcode_sources: Vec<RegisteredSource<XcodeVersionRecord>>,
    swift_sources: Vec<RegisteredSource<SwiftVersionRecord>>,
    verifier: Option<RegisteredVerifier>,
    gate: Arc<dyn FetchGate>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline with a pass-through gate.
    pub fn new() -> Self {
        Self {
            restore_image_sources: Vec::new(),
            xcode_sources: Vec::new(),
            swift_sources: Vec::new(),
            verifier: None,
            gate: Arc::new(AlwaysFetch),
        }
    }

    /// The production source set. Signing enrichment is only wired up when an API key for
    /// the verifier is available.
    pub fn standard(client: reqwest::Client, virtualbuddy_api_key: Option<String>) -> Self {
        use FetchPolicy::{BestEffort, Required};
        use SourceGroup::{Beta, CommunityWiki, Primary};

        let pipeline = Pipeline::new()
            .with_restore_image_source(RegisteredSource::new(
                crate::sources::ipsw::SOURCE_ID,
                Required,
                Primary,
                IpswFetcher::new(client.clone()),
            ))
            .with_restore_image_source(RegisteredSource::new(
                crate::sources::appledb::SOURCE_ID,
                BestEffort,
                Primary,
                AppleDbFetcher::new(client.clone()),
            ))
            .with_restore_image_source(RegisteredSource::new(
                crate::sources::mesu::SOURCE_ID,
                BestEffort,
                Primary,
                MesuFetcher::new(client.clone()),
            ))
            .with_restore_image_source(RegisteredSource::new(
                crate::sources::mrmacintosh::SOURCE_ID,
                BestEffort,
                Beta,
                MrMacintoshFetcher::new(client.clone()),
            ))
            .with_restore_image_source(RegisteredSource::new(
                crate::sources::theapplewiki::SOURCE_ID,
                BestEffort,
                CommunityWiki,
                TheAppleWikiFetcher::new(client.clone()),
            ))
            .with_xcode_source(RegisteredSource::new(
                crate::sources::xcodereleases::SOURCE_ID,
                Required,
                Primary,
                XcodeReleasesFetcher::new(client.clone()),
            ))
            .with_swift_source(RegisteredSource::new(
                crate::sources::swiftversion::SOURCE_ID,
                Required,
                Primary,
                SwiftVersionFetcher::new(client.clone()),
            ));

        match virtualbuddy_api_key {
            Some(api_key) => pipeline.with_signing_verifier(
                crate::sources::virtualbuddy::SOURCE_ID,
                VirtualBuddyVerifier::new(client, api_key),
            ),
            None => {
                info!("[PIPELINE] No VirtualBuddy API key, signing enrichment disabled");
                pipeline
            }
        }
    }

    pub fn with_restore_image_source(mut self, source: RegisteredSource<RestoreImageRecord>) -> Self {
        self.restore_image_sources.push(source);
        self
    }

    pub fn with_xcode_source(mut self, source: RegisteredSource<XcodeVersionRecord>) -> Self {
        self.xcode_sources.push(source);
        self
    }

    pub fn with_swift_source(mut self, source: RegisteredSource<SwiftVersionRecord>) -> Self {
        self.swift_sources.push(source);
        self
    }

    pub fn with_signing_verifier(
        mut self,
        id: impl Into<String>,
        verifier: impl SigningVerifier + 'static,
    ) -> Self {
        self.verifier = Some(RegisteredVerifier {
            id: id.into(),
            verifier: Arc::new(verifier),
        });
        self
    }

    pub fn with_gate(mut self, gate: impl FetchGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    /// Runs one complete fetch. Returns either every requested collection or an error;
    /// never a partial result.
    pub async fn fetch(&self, options: &FetchOptions) -> Result<FetchResult, PipelineError> {
        let run_id = Uuid::new_v4();
        self.fetch_all(options)
            .instrument(info_span!("fetch", %run_id))
            .await
    }

    async fn fetch_all(&self, options: &FetchOptions) -> Result<FetchResult, PipelineError> {
        options.trace_loaded();
        info!("[PIPELINE] Starting fetch");

        let restore_images = if options.include_restore_images {
            self.fetch_restore_images(options).await?
        } else {
            Vec::new()
        };

        let xcode_versions = if options.include_xcode_versions {
            let raw = self
                .collect(EntityKind::XcodeVersions, &self.xcode_sources, options)
                .await?;
            resolve_minimum_macos(deduplicate_xcode_versions(raw), &restore_images)
        } else {
            Vec::new()
        };

        let swift_versions = if options.include_swift_versions {
            let raw = self
                .collect(EntityKind::SwiftVersions, &self.swift_sources, options)
                .await?;
            deduplicate_swift_versions(raw)
        } else {
            Vec::new()
        };

        info!(
            restore_images = restore_images.len(),
            xcode_versions = xcode_versions.len(),
            swift_versions = swift_versions.len(),
            "[PIPELINE] Fetch complete"
        );

        Ok(FetchResult {
            restore_images,
            xcode_versions,
            swift_versions,
        })
    }

    async fn fetch_restore_images(
        &self,
        options: &FetchOptions,
    ) -> Result<Vec<RestoreImageRecord>, PipelineError> {
        let raw = self
            .collect(EntityKind::RestoreImages, &self.restore_image_sources, options)
            .await?;
        let raw_count = raw.len();
        let images = deduplicate_restore_images(raw);
        info!(
            raw = raw_count,
            unique = images.len(),
            "[PIPELINE] Deduplicated restore images"
        );

        if options.include_signing_verification {
            Ok(self.enrich_signing(images, options).await)
        } else {
            Ok(images)
        }
    }

    /// Merges an authoritative overlay from the verifier into each image. Any failure
    /// leaves the affected image as it was.
    async fn enrich_signing(
        &self,
        images: Vec<RestoreImageRecord>,
        options: &FetchOptions,
    ) -> Vec<RestoreImageRecord> {
        let Some(registered) = &self.verifier else {
            info!("[PIPELINE] No signing verifier configured, skipping enrichment");
            return images;
        };
        if !options.force && !self.gate.should_fetch(&registered.id) {
            info!(source = %registered.id, "[PIPELINE] Signing enrichment skipped by fetch gate");
            return images;
        }

        let checked_at = Utc::now();
        let checked: Vec<(RestoreImageRecord, bool)> = stream::iter(images)
            .then(|image| async move {
                match registered.verifier.signing_status(&image).await {
                    Ok(Some(signed)) => {
                        let overlay = RestoreImageRecord {
                            is_signed: Some(signed),
                            source: registered.id.clone(),
                            source_updated_at: Some(checked_at),
                            notes: None,
                            ..image.clone()
                        };
                        (merge_restore_images(&image, &overlay), true)
                    }
                    Ok(None) => (image, true),
                    Err(e) => {
                        warn!(
                            build = %image.build_number,
                            source = %registered.id,
                            error = %e,
                            "[PIPELINE] Signing verification failed, keeping image unenriched"
                        );
                        (image, false)
                    }
                }
            })
            .collect()
            .await;

        let answered = checked.iter().filter(|(_, ok)| *ok).count();
        // Only a verifier that answered at least once counts as fetched.
        if answered > 0 {
            self.gate.record_fetch(&registered.id);
        } else if !checked.is_empty() {
            warn!(source = %registered.id, "[PIPELINE] Every signing verification failed");
        }
        checked.into_iter().map(|(image, _)| image).collect()
    }

    /// Fetches from every enabled source and concatenates the per-source results.
    async fn collect<T: Send + Sync + 'static>(
        &self,
        entity: EntityKind,
        sources: &[RegisteredSource<T>],
        options: &FetchOptions,
    ) -> Result<Vec<T>, PipelineError> {
        let mut fetched: Vec<Vec<T>> = Vec::with_capacity(sources.len());
        for registered in sources {
            if self.is_enabled(registered.id.as_str(), registered.group, options) {
                fetched.push(self.fetch_one(entity, registered).await?);
            }
        }
        Ok(fetched.into_iter().flatten().collect())
    }

    async fn fetch_one<T: Send + Sync + 'static>(
        &self,
        entity: EntityKind,
        registered: &RegisteredSource<T>,
    ) -> Result<Vec<T>, PipelineError> {
        info!(%entity, source = %registered.id, "[SOURCE] Fetching");
        match registered.source.fetch().await {
            Ok(records) => {
                self.gate.record_fetch(&registered.id);
                info!(
                    %entity,
                    source = %registered.id,
                    count = records.len(),
                    "[SOURCE] Fetch succeeded"
                );
                Ok(records)
            }
            Err(e) => match registered.policy {
                FetchPolicy::BestEffort => {
                    warn!(
                        %entity,
                        source = %registered.id,
                        error = %e,
                        "[SOURCE] Best-effort source failed, continuing without it"
                    );
                    Ok(Vec::new())
                }
                FetchPolicy::Required => {
                    error!(
                        %entity,
                        source = %registered.id,
                        error = %e,
                        "[SOURCE][ERROR] Required source failed"
                    );
                    Err(PipelineError::SourceFailed {
                        entity,
                        source_id: registered.id.clone(),
                        error: e,
                    })
                }
            },
        }
    }

    fn is_enabled(&self, id: &str, group: SourceGroup, options: &FetchOptions) -> bool {
        let group_enabled = match group {
            SourceGroup::Primary => true,
            SourceGroup::Beta => options.include_betas,
            SourceGroup::CommunityWiki => options.include_community_wiki,
        };
        if !group_enabled {
            debug!(source = id, ?group, "[SOURCE] Excluded by options");
            return false;
        }
        if let Some(only) = options.only_source.as_deref() {
            if only != id {
                debug!(source = id, only_source = only, "[SOURCE] Excluded by source filter");
                return false;
            }
        }
        if !options.force && !self.gate.should_fetch(id) {
            info!(source = id, "[SOURCE] Skipped by fetch gate");
            return false;
        }
        true
    }
}
