//! Snapshot backend client.
//!
//! Frames that cannot embed the target ask a third-party screenshot service
//! for an image at the device's effective viewport. This module builds those
//! requests, builds the placeholder shown when they fail, and fetches them.

use crate::device::{DeviceId, DeviceMetrics, Orientation};
use crate::frame::FrameKey;
use crate::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use url::Url;

/// Alt text of the placeholder shown for a failed snapshot
pub const PLACEHOLDER_ALT: &str = "Snapshot Unavailable";

const PLACEHOLDER_COLORS: [&str; 2] = ["020617", "indigo"];

/// A fetched snapshot image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotImage {
    pub content_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl SnapshotImage {
    /// File extension matching the content type, `img` when unknown.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            _ => "img",
        }
    }
}

/// Screenshot request for `target` rendered with the given device metrics.
///
/// The target is form-encoded into the `url` parameter; the service is asked
/// to answer with the screenshot asset itself rather than JSON metadata.
/// Query pairs already on the endpoint (an API key, say) are kept.
pub fn request_url(endpoint: &Url, target: &str, metrics: &DeviceMetrics) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("url", target)
        .append_pair("screenshot", "true")
        .append_pair("embed", "screenshot.url")
        .append_pair("viewport.width", &metrics.width.to_string())
        .append_pair("viewport.height", &metrics.height.to_string())
        .append_pair("viewport.isMobile", bool_str(metrics.mobile))
        .append_pair("viewport.hasTouch", bool_str(metrics.touch))
        .append_pair("viewport.deviceScaleFactor", &format!("{}", metrics.dpr));
    url
}

/// Generated stand-in image with the same dimensions as the frame:
/// `{endpoint path}/{w}x{h}/{background}/{foreground}?text=Snapshot+Unavailable`.
pub fn placeholder_url(endpoint: &Url, width: u32, height: u32) -> String {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(&format!("{}x{}", width, height))
            .extend(PLACEHOLDER_COLORS);
    }
    url.query_pairs_mut().append_pair("text", PLACEHOLDER_ALT);
    url.into()
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Stable on-disk name for a frame's snapshot:
/// `{device}-{url digest}-{p|l}-g{generation}.{ext}`.
pub fn file_name(device: DeviceId, key: &FrameKey, image: &SnapshotImage) -> String {
    let digest = Sha256::digest(key.url.as_bytes());
    let short = &hex::encode(digest)[..12];
    let orientation = match key.orientation {
        Orientation::Portrait => 'p',
        Orientation::Landscape => 'l',
    };
    format!(
        "{}-{}-{}-g{}.{}",
        device,
        short,
        orientation,
        key.generation,
        image.extension()
    )
}

/// Fetches snapshot images. Any error is treated by the caller as a failed
/// snapshot; implementations should not retry.
pub trait SnapshotFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<SnapshotImage>> + Send;
}

#[cfg(feature = "http")]
pub use http::HttpSnapshotFetcher;

#[cfg(feature = "http")]
mod http {
    use super::{SnapshotFetcher, SnapshotImage};
    use crate::{Error, Result};
    use log::debug;
    use std::future::Future;
    use std::time::Duration;
    use url::Url;

    /// reqwest-backed fetcher. Non-2xx answers and non-image bodies are
    /// errors.
    #[derive(Debug, Clone)]
    pub struct HttpSnapshotFetcher {
        client: reqwest::Client,
        timeout_ms: u64,
    }

    impl HttpSnapshotFetcher {
        pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client, timeout_ms })
        }

        fn request_error(&self, err: reqwest::Error) -> Error {
            if err.is_timeout() {
                Error::Timeout(self.timeout_ms)
            } else {
                err.into()
            }
        }

        async fn get(&self, url: &str) -> Result<SnapshotImage> {
            let url = Url::parse(url)?;
            let res = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| self.request_error(e))?;
            let status = res.status();
            if !status.is_success() {
                return Err(Error::SnapshotError(format!("backend answered {}", status)));
            }

            let content_type = res
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !content_type.to_ascii_lowercase().starts_with("image/") {
                return Err(Error::SnapshotError(format!(
                    "expected an image, got '{}'",
                    content_type
                )));
            }

            let data = res
                .bytes()
                .await
                .map_err(|e| self.request_error(e))?
                .to_vec();
            debug!("fetched {} bytes of {} from {}", data.len(), content_type, url);
            Ok(SnapshotImage { content_type, data })
        }
    }

    impl SnapshotFetcher for HttpSnapshotFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<SnapshotImage>> + Send {
            let url = url.to_string();
            async move { self.get(&url).await }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://api.microlink.io/").unwrap()
    }

    #[test]
    fn request_carries_viewport_parameters() {
        let metrics = DeviceId::Mobile.profile().metrics(Orientation::Portrait);
        let url = request_url(&endpoint(), "https://chatgpt.com/?q=a b&x=1", &metrics);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("url"), "https://chatgpt.com/?q=a b&x=1");
        assert_eq!(get("screenshot"), "true");
        assert_eq!(get("embed"), "screenshot.url");
        assert_eq!(get("viewport.width"), "390");
        assert_eq!(get("viewport.height"), "844");
        assert_eq!(get("viewport.isMobile"), "true");
        assert_eq!(get("viewport.hasTouch"), "true");
        assert_eq!(get("viewport.deviceScaleFactor"), "2");

        // the target is encoded, not spliced into the outer query
        assert!(!url.as_str().contains("chatgpt.com/?q"));
        assert_eq!(url.host_str(), Some("api.microlink.io"));
    }

    #[test]
    fn laptop_request_is_not_mobile_or_touch() {
        let metrics = DeviceId::Laptop.profile().metrics(Orientation::Portrait);
        let url = request_url(&endpoint(), "https://github.com", &metrics);
        let q = url.query().unwrap();
        assert!(q.contains("viewport.isMobile=false"));
        assert!(q.contains("viewport.hasTouch=false"));
        assert!(q.contains("viewport.width=1366"));
    }

    #[test]
    fn placeholder_matches_dimensions() {
        let base = Url::parse("https://placehold.co/").unwrap();
        assert_eq!(
            placeholder_url(&base, 1024, 768),
            "https://placehold.co/1024x768/020617/indigo?text=Snapshot+Unavailable"
        );
    }

    #[test]
    fn request_keeps_endpoint_query() {
        let endpoint = Url::parse("https://shots.example/api?key=abc").unwrap();
        let metrics = DeviceId::Tablet.profile().metrics(Orientation::Portrait);
        let url = request_url(&endpoint, "https://chatgpt.com", &metrics);
        let q = url.query().unwrap();
        assert!(q.starts_with("key=abc&url=https%3A%2F%2Fchatgpt.com&"), "{}", q);
        assert!(q.contains("viewport.width=768"));
        assert_eq!(url.path(), "/api");
    }

    #[test]
    fn placeholder_goes_under_endpoint_path() {
        let base = Url::parse("https://ph.example/img?v=1").unwrap();
        assert_eq!(
            placeholder_url(&base, 390, 844),
            "https://ph.example/img/390x844/020617/indigo?v=1&text=Snapshot+Unavailable"
        );

        let base = Url::parse("https://ph.example/img/").unwrap();
        assert_eq!(
            placeholder_url(&base, 390, 844),
            "https://ph.example/img/390x844/020617/indigo?text=Snapshot+Unavailable"
        );
    }

    #[test]
    fn file_names_depend_on_orientation() {
        let portrait = FrameKey {
            url: "https://chatgpt.com".into(),
            orientation: Orientation::Portrait,
            generation: 0,
        };
        let landscape = FrameKey {
            orientation: Orientation::Landscape,
            ..portrait.clone()
        };
        let img = SnapshotImage {
            content_type: "image/png".into(),
            data: vec![],
        };
        let p = file_name(DeviceId::Mobile, &portrait, &img);
        let l = file_name(DeviceId::Mobile, &landscape, &img);
        assert_ne!(p, l);
        assert!(p.ends_with("-p-g0.png"));
        assert!(l.ends_with("-l-g0.png"));
    }

    #[test]
    fn file_names_are_stable_per_key() {
        let key = FrameKey {
            url: "https://chatgpt.com".into(),
            orientation: Orientation::Portrait,
            generation: 2,
        };
        let img = SnapshotImage {
            content_type: "image/PNG; charset=binary".into(),
            data: vec![1, 2, 3],
        };
        let a = file_name(DeviceId::Tablet, &key, &img);
        let b = file_name(DeviceId::Tablet, &key, &img);
        assert_eq!(a, b);
        assert!(a.starts_with("tablet-"));
        assert!(a.ends_with("-p-g2.png"));
        assert_eq!(a.len(), "tablet-".len() + 12 + "-p-g2.png".len());
    }

    #[test]
    fn unknown_content_type_gets_generic_extension() {
        let img = SnapshotImage {
            content_type: "application/octet-stream".into(),
            data: vec![],
        };
        assert_eq!(img.extension(), "img");
    }
}
