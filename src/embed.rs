//! Live embed descriptor.
//!
//! A live frame loads the target URL straight into a restricted embedding
//! context. Nothing is reported back from that surface, so this is only the
//! description an outer renderer needs to mount it.

use crate::device::DeviceProfile;
use serde::Serialize;

/// Sandbox permissions granted to live embeds. Top-level navigation is
/// deliberately absent.
pub const SANDBOX: &[&str] = &[
    "allow-forms",
    "allow-modals",
    "allow-popups",
    "allow-presentation",
    "allow-same-origin",
    "allow-scripts",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedSpec {
    /// URL loaded into the embed
    pub src: String,
    /// Accessible title, the device name
    pub title: &'static str,
    /// Mount identity; a new key forces the surface to reload
    pub key: String,
    /// Space separated sandbox tokens
    pub sandbox: String,
    pub lazy: bool,
}

impl EmbedSpec {
    pub fn new(profile: &DeviceProfile, url: &str, generation: u64) -> Self {
        Self {
            src: url.to_string(),
            title: profile.name,
            key: mount_key(profile, generation),
            sandbox: SANDBOX.join(" "),
            lazy: true,
        }
    }
}

/// `{device}-{generation}`, shared by embeds and snapshot images.
pub fn mount_key(profile: &DeviceProfile, generation: u64) -> String {
    format!("{}-{}", profile.id, generation)
}
