use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a single [`crate::pipeline::Pipeline::fetch`] call should gather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub include_restore_images: bool,
    pub include_xcode_versions: bool,
    pub include_swift_versions: bool,
    /// Beta and release-candidate restore-image sources.
    pub include_betas: bool,
    /// Community-maintained wiki sources.
    pub include_community_wiki: bool,
    /// Overlay signing status from the privileged verifier, when one is configured.
    pub include_signing_verification: bool,
    /// Ignore the fetch gate.
    pub force: bool,
    /// When set, only the source with this id is fetched for each included entity type.
    pub only_source: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            include_restore_images: true,
            include_xcode_versions: true,
            include_swift_versions: true,
            include_betas: true,
            include_community_wiki: true,
            include_signing_verification: true,
            force: false,
            only_source: None,
        }
    }
}

impl FetchOptions {
    pub fn trace_loaded(&self) {
        info!(
            restore_images = self.include_restore_images,
            xcode_versions = self.include_xcode_versions,
            swift_versions = self.include_swift_versions,
            force = self.force,
            only_source = self.only_source.as_deref().unwrap_or("<all>"),
            "Loaded FetchOptions"
        );
        debug!(?self, "FetchOptions loaded (full debug)");
    }
}
