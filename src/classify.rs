//! Compatibility classifier: decides whether a URL can be embedded live or
//! has to be shown as a server-rendered snapshot.
//!
//! The decision is a substring heuristic over two fixed lists. It never looks
//! at real response headers; [`HeaderProbeClassifier`] layers an optional
//! header probe on top for URLs the lists say nothing about.

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Local and developer-hosting indicators that are always embeddable.
pub const ALLOW_LIST: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "vercel.app",
    "netlify.app",
    "pages.dev",
    "gitpod.io",
];

/// Platforms known to refuse third-party framing.
pub const BLOCK_LIST: &[&str] = &[
    "instagram.com",
    "chatgpt.com",
    "openai.com",
    "facebook.com",
    "amazon.com",
    "google.com",
    "github.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "apple.com",
    "netflix.com",
    "youtube.com",
    "reddit.com",
    "pinterest.com",
    "quora.com",
    "medium.com",
    "discord.com",
    "twitch.tv",
];

/// How every device frame of a session renders the target URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingStrategy {
    /// Load the URL directly into a sandboxed embed
    #[default]
    Live,
    /// Show an image rendered by the snapshot backend
    Snapshot,
}

impl RenderingStrategy {
    pub fn label(self) -> &'static str {
        match self {
            RenderingStrategy::Live => "Live",
            RenderingStrategy::Snapshot => "Snapshot",
        }
    }
}

/// Which list, if any, decided a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMatch {
    Allowed,
    Blocked,
    Unlisted,
}

impl ListMatch {
    pub fn strategy(self) -> RenderingStrategy {
        match self {
            ListMatch::Blocked => RenderingStrategy::Snapshot,
            ListMatch::Allowed | ListMatch::Unlisted => RenderingStrategy::Live,
        }
    }
}

/// Match a URL against the allow and block lists. The allow list wins.
pub fn match_lists(url: &str) -> ListMatch {
    let lower = url.to_lowercase();
    if ALLOW_LIST.iter().any(|s| lower.contains(s)) {
        ListMatch::Allowed
    } else if BLOCK_LIST.iter().any(|s| lower.contains(s)) {
        ListMatch::Blocked
    } else {
        ListMatch::Unlisted
    }
}

/// Classify a URL with the list heuristic. Unknown sites are optimistically
/// assumed to be embeddable.
pub fn classify(url: &str) -> RenderingStrategy {
    match_lists(url).strategy()
}

/// Asynchronous classification seam used by the session controller.
pub trait Classifier: Send + Sync {
    fn classify(&self, url: &str) -> impl Future<Output = RenderingStrategy> + Send;
}

/// The list heuristic behind the async seam.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl Classifier for HeuristicClassifier {
    fn classify(&self, url: &str) -> impl Future<Output = RenderingStrategy> + Send {
        let strategy = classify(url);
        async move { strategy }
    }
}

/// Returns true when the given framing headers forbid embedding in a
/// third-party page.
///
/// `X-Frame-Options: DENY|SAMEORIGIN` blocks. A CSP `frame-ancestors`
/// directive blocks unless it lists `*`.
pub fn framing_blocked(x_frame_options: Option<&str>, csp: Option<&str>) -> bool {
    if let Some(xfo) = x_frame_options {
        let xfo = xfo.trim();
        if xfo.eq_ignore_ascii_case("deny") || xfo.eq_ignore_ascii_case("sameorigin") {
            return true;
        }
    }

    let Some(csp) = csp else {
        return false;
    };
    for directive in csp.split(';') {
        let mut parts = directive.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        if name.eq_ignore_ascii_case("frame-ancestors") {
            return !parts.any(|src| src == "*");
        }
    }
    false
}

#[cfg(feature = "http")]
pub use probe::HeaderProbeClassifier;

#[cfg(feature = "http")]
mod probe {
    use super::{framing_blocked, match_lists, Classifier, ListMatch, RenderingStrategy};
    use crate::{Error, Result};
    use log::{debug, warn};
    use std::future::Future;
    use std::time::Duration;

    /// Heuristic first, then a `HEAD` request for URLs neither list covers.
    ///
    /// Probe failures fall back to the heuristic answer, so this never makes
    /// a decision worse than [`super::classify`].
    #[derive(Debug, Clone)]
    pub struct HeaderProbeClassifier {
        client: reqwest::Client,
        timeout_ms: u64,
    }

    impl HeaderProbeClassifier {
        pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client, timeout_ms })
        }

        /// Whether `url` answers with headers that forbid third-party framing.
        pub async fn probe(&self, url: &str) -> Result<bool> {
            let res = self.client.head(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout_ms)
                } else {
                    e.into()
                }
            })?;
            let headers = res.headers();
            let xfo = headers
                .get("x-frame-options")
                .and_then(|v| v.to_str().ok());
            let csp = headers
                .get("content-security-policy")
                .and_then(|v| v.to_str().ok());
            Ok(framing_blocked(xfo, csp))
        }
    }

    impl Classifier for HeaderProbeClassifier {
        fn classify(&self, url: &str) -> impl Future<Output = RenderingStrategy> + Send {
            let url = url.to_string();
            async move {
                let listed = match_lists(&url);
                if listed != ListMatch::Unlisted {
                    return listed.strategy();
                }
                match self.probe(&url).await {
                    Ok(true) => {
                        debug!("{} refuses framing; using snapshots", url);
                        RenderingStrategy::Snapshot
                    }
                    Ok(false) => RenderingStrategy::Live,
                    Err(e) => {
                        warn!("Header probe for {} failed: {}", url, e);
                        listed.strategy()
                    }
                }
            }
        }
    }
}
