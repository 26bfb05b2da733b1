//! LayoutLab
//!
//! Renders one target URL inside several fixed-size device frames (mobile,
//! tablet, laptop, desktop) at once, so responsive layouts can be compared
//! side by side.
//!
//! The interesting part is deciding *how* each frame shows the page: live, in
//! a sandboxed embed, or as an image rendered by a snapshot backend for sites
//! that refuse to be framed. The crate is organised leaf to root:
//!
//! - [`normalize`]: raw user text to a scheme-qualified URL
//! - [`classify`]: URL to [`RenderingStrategy`]
//! - [`device`]: the device registry and orientation-aware sizes
//! - [`frame`]: the per-device render-state machine
//! - [`session`]: the session controller and its mutators
//! - [`async_api`]: a background driver that runs classification and
//!   snapshot fetches concurrently
//!
//! # Example
//!
//! ```
//! use layoutlab::{HeuristicClassifier, LabConfig, RenderingStrategy, Session};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = LabConfig { analysis_delay_ms: 0, ..Default::default() };
//! let mut session = Session::new(&config);
//!
//! session.submit_url("chatgpt.com", &HeuristicClassifier).await;
//! assert_eq!(session.state().canonical_url(), "https://chatgpt.com");
//! assert_eq!(session.state().strategy(), RenderingStrategy::Snapshot);
//! # }
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub mod error;
pub use error::{Error, Result};

pub mod classify;
pub mod device;
pub mod embed;
pub mod frame;
pub mod normalize;
pub mod session;
pub mod snapshot;

// Background session driver (command channel + spawned fetches)
pub mod async_api;

pub use async_api::{FrameReport, Preview, PreviewBoard};
pub use classify::{classify, Classifier, HeuristicClassifier, RenderingStrategy};
pub use device::{effective_size, DeviceId, DeviceMetrics, DeviceProfile, Orientation, DEVICES};
pub use frame::{FrameKey, FrameMachine, FramePhase, FrameRenderState, FrameSet, FrameView};
pub use normalize::normalize;
pub use session::{Classification, Session, SessionState, Submission};
pub use snapshot::{SnapshotFetcher, SnapshotImage};

#[cfg(feature = "http")]
pub use classify::HeaderProbeClassifier;
#[cfg(feature = "http")]
pub use snapshot::HttpSnapshotFetcher;

/// Smallest zoom factor a session accepts
pub const MIN_ZOOM: f32 = 0.2;
/// Largest zoom factor a session accepts
pub const MAX_ZOOM: f32 = 1.0;
/// Zoom factor of a fresh session
pub const DEFAULT_ZOOM: f32 = 0.35;

/// Configuration for a preview session
///
/// The defaults mirror the hosted tool: an 800ms "analyzing" phase, the
/// Microlink screenshot API and placehold.co for failed snapshots.
///
/// Every field is optional when loading from JSON:
///
/// ```
/// let cfg: layoutlab::LabConfig = serde_json::from_str(r#"{"default_zoom": 0.5}"#).unwrap();
/// assert_eq!(cfg.default_zoom, 0.5);
/// assert_eq!(cfg.analysis_delay_ms, 800);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Minimum time a submission reports "classifying", in milliseconds
    pub analysis_delay_ms: u64,
    /// Zoom factor of a fresh session
    pub default_zoom: f32,
    /// Base URL of the screenshot-rendering service
    pub snapshot_endpoint: String,
    /// Base URL of the placeholder image generator
    pub placeholder_endpoint: String,
    /// Timeout for snapshot fetches and header probes in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with outgoing requests
    pub user_agent: String,
    /// Probe framing headers of URLs the heuristic lists do not cover
    pub probe_headers: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            analysis_delay_ms: 800,
            default_zoom: DEFAULT_ZOOM,
            snapshot_endpoint: "https://api.microlink.io/".to_string(),
            placeholder_endpoint: "https://placehold.co/".to_string(),
            timeout_ms: 30000,
            user_agent: format!("layoutlab/{}", env!("CARGO_PKG_VERSION")),
            probe_headers: false,
        }
    }
}

impl LabConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        let cfg: LabConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be positive".into()));
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.default_zoom) {
            return Err(Error::ConfigError(format!(
                "default_zoom {} outside [{}, {}]",
                self.default_zoom, MIN_ZOOM, MAX_ZOOM
            )));
        }
        self.endpoints().map(|_| ())
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }

    /// Parsed backend endpoints.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let parse = |name: &str, raw: &str| -> Result<Url> {
            if raw.trim().is_empty() {
                return Err(Error::ConfigError(format!("{} must not be empty", name)));
            }
            let url =
                Url::parse(raw).map_err(|e| Error::ConfigError(format!("{}: {}", name, e)))?;
            if url.cannot_be_a_base() {
                return Err(Error::ConfigError(format!("{} has no path: {}", name, raw)));
            }
            Ok(url)
        };
        Ok(Endpoints {
            snapshot: parse("snapshot_endpoint", &self.snapshot_endpoint)?,
            placeholder: parse("placeholder_endpoint", &self.placeholder_endpoint)?,
        })
    }
}

/// External services a frame points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub snapshot: Url,
    pub placeholder: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabConfig::default();
        assert_eq!(config.analysis_delay_ms, 800);
        assert_eq!(config.default_zoom, 0.35);
        assert!(!config.probe_headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let cfg = LabConfig {
            default_zoom: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));

        let cfg = LabConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LabConfig {
            snapshot_endpoint: "  ".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LabConfig {
            placeholder_endpoint: "not a url".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LabConfig {
            placeholder_endpoint: "mailto:shots@example.com".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));

        // a query on an endpoint is fine
        let cfg = LabConfig {
            snapshot_endpoint: "https://shots.example/api?key=abc".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = std::env::temp_dir().join(format!("layoutlab-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lab.json");
        std::fs::write(&path, r#"{"analysis_delay_ms": 10, "probe_headers": true}"#).unwrap();

        let cfg = LabConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.analysis_delay(), Duration::from_millis(10));
        assert!(cfg.probe_headers);
        assert_eq!(cfg.timeout_ms, 30000);

        std::fs::write(&path, "{ nope").unwrap();
        assert!(LabConfig::from_json_file(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
