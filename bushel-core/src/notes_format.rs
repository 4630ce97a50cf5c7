//! The pipe-delimited notes encoding the Xcode fetcher uses to carry its requirement text
//! and release-notes link through to reference resolution.
//!
//! ```text
//! notes   := segment ( '|' segment )*
//! segment := KEY ':' VALUE        (split at the first ':')
//! KEY     := "REQUIRES" | "NOTES_URL"
//! ```
//!
//! Unknown keys and segments without a colon are ignored. When a key repeats, the first
//! occurrence is kept.

use std::sync::OnceLock;

use regex::Regex;

const REQUIRES: &str = "REQUIRES";
const NOTES_URL: &str = "NOTES_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedNotes {
    pub requires: Option<String>,
    pub notes_url: Option<String>,
}

impl EncodedNotes {
    pub fn parse(raw: &str) -> Self {
        let mut parsed = EncodedNotes::default();
        for segment in raw.split('|') {
            let Some((key, value)) = segment.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.trim() {
                REQUIRES => &mut parsed.requires,
                NOTES_URL => &mut parsed.notes_url,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        parsed
    }

    /// Inverse of [`EncodedNotes::parse`]; `None` when there is nothing to carry.
    pub fn encode(&self) -> Option<String> {
        let segments: Vec<String> = [(REQUIRES, &self.requires), (NOTES_URL, &self.notes_url)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}:{v}")))
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("|"))
        }
    }

    /// First dotted version (2 to 4 numeric components) in the REQUIRES text.
    pub fn required_version(&self) -> Option<String> {
        self.requires.as_deref().and_then(extract_version)
    }
}

/// Returns the first dotted-numeric substring with 2 to 4 components, e.g. `"14.2"` from
/// `"macOS 14.2 or later"`.
pub fn extract_version(text: &str) -> Option<String> {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let re = VERSION.get_or_init(|| {
        Regex::new(r"\d+(?:\.\d+){1,3}").expect("version pattern is valid")
    });
    re.find(text).map(|m| m.as_str().to_string())
}
