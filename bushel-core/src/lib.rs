#![doc = "bushel-core: aggregation pipeline for macOS restore image, Xcode and Swift release metadata."]

//! Sources disagree, overlap and fail independently. This crate fetches from all of them,
//! merges records that describe the same artifact, links Xcode releases to the macOS
//! restore image they require, and hands the result to a remote store.
//!
//! # Layout
//! - [`pipeline`]: fetch orchestration and per-source failure policy
//! - [`merge`], [`dedup`]: record reconciliation
//! - [`references`], [`notes_format`]: Xcode → restore image links
//! - [`synchronise`]: publishing in dependency order
//! - [`contract`]: the traits the pipeline talks through; [`sources`] implements them

pub mod config;
pub mod contract;
pub mod dedup;
pub mod error;
pub mod gate;
pub mod merge;
pub mod model;
pub mod notes_format;
pub mod pipeline;
pub mod references;
pub mod sources;
pub mod synchronise;

pub use config::FetchOptions;
pub use error::{FetchError, PipelineError, PublishError, SyncError};
pub use model::{EntityKind, FetchResult, RestoreImageRecord, SwiftVersionRecord, XcodeVersionRecord};
pub use pipeline::{FetchPolicy, Pipeline, RegisteredSource, SourceGroup};
