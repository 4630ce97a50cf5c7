//! `load_config`: reads the static YAML config and injects secrets from the environment.
//!
//! The YAML file never holds credentials. Tokens come from `BUSHEL_PUBLISH_TOKEN` and
//! `VIRTUALBUDDY_API_KEY` (a `.env` file is loaded by `main` before this runs).
//!
//! ```yaml
//! fetch:
//!   betas: false
//!   only_source: appledb.dev
//! publish:
//!   endpoint: https://store.example/api
//!   batch_size: 100
//! ```
//!
//! Every key is optional except `publish.endpoint` when a `publish` section is present.

use anyhow::Result;
use bushel_core::synchronise::DEFAULT_BATCH_SIZE;
use bushel_core::FetchOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const PUBLISH_TOKEN_ENV: &str = "BUSHEL_PUBLISH_TOKEN";
pub const VIRTUALBUDDY_API_KEY_ENV: &str = "VIRTUALBUDDY_API_KEY";

#[derive(Debug)]
pub struct CliConfig {
    pub fetch: FetchSection,
    pub publish: Option<PublishSection>,
    pub secrets: Secrets,
}

/// Inclusion toggles; each defaults to on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub restore_images: bool,
    pub xcode_versions: bool,
    pub swift_versions: bool,
    pub betas: bool,
    pub community_wiki: bool,
    pub signing_verification: bool,
    pub only_source: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Self {
            restore_images: defaults.include_restore_images,
            xcode_versions: defaults.include_xcode_versions,
            swift_versions: defaults.include_swift_versions,
            betas: defaults.include_betas,
            community_wiki: defaults.include_community_wiki,
            signing_verification: defaults.include_signing_verification,
            only_source: defaults.only_source,
        }
    }
}

impl FetchSection {
    pub fn to_options(&self) -> FetchOptions {
        FetchOptions {
            include_restore_images: self.restore_images,
            include_xcode_versions: self.xcode_versions,
            include_swift_versions: self.swift_versions,
            include_betas: self.betas,
            include_community_wiki: self.community_wiki,
            include_signing_verification: self.signing_verification,
            force: false,
            only_source: self.only_source.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    pub endpoint: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Credentials read from the environment. Empty values count as absent.
#[derive(Clone, Default)]
pub struct Secrets {
    pub publish_token: Option<String>,
    pub virtualbuddy_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("publish_token_set", &self.publish_token.is_some())
            .field("virtualbuddy_api_key_set", &self.virtualbuddy_api_key.is_some())
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            publish_token: non_empty_env(PUBLISH_TOKEN_ENV),
            virtualbuddy_api_key: non_empty_env(VIRTUALBUDDY_API_KEY_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    fetch: FetchSection,
    #[serde(default)]
    publish: Option<PublishSection>,
}

/// Loads the YAML file at `path` and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid config with every default.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => conf,
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    if let Some(publish) = &raw.publish {
        if publish.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("publish.endpoint must not be empty"));
        }
        if publish.batch_size == 0 {
            return Err(anyhow::anyhow!("publish.batch_size must be at least 1"));
        }
    }

    let secrets = Secrets::from_env();
    info!(
        config_path = ?path_ref,
        publish_configured = raw.publish.is_some(),
        ?secrets,
        "Configuration loaded"
    );

    Ok(CliConfig {
        fetch: raw.fetch,
        publish: raw.publish,
        secrets,
    })
}
