//! Integration tests for the HTTP snapshot fetcher and the header probe
#![cfg(feature = "http")]

use layoutlab::{
    Classifier, Error, HeaderProbeClassifier, HttpSnapshotFetcher, LabConfig, Preview,
    RenderingStrategy, SnapshotFetcher,
};
use layoutlab::{FramePhase, FrameView};
use tiny_http::{Header, Response, Server};

fn header(raw: &str) -> Header {
    raw.parse::<Header>().unwrap()
}

/// Start a test server on an ephemeral port and return its base URL
fn start_test_server() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let path = request.url().to_string();
            let response = if path.starts_with("/shot") {
                // tablet snapshots fail, everything else is a tiny PNG
                if path.contains("viewport.width=768&") {
                    Response::from_string("no").with_status_code(502)
                } else {
                    Response::from_data(vec![0x89, b'P', b'N', b'G'])
                        .with_header(header("Content-Type: image/png"))
                }
            } else if path == "/slow" {
                std::thread::sleep(std::time::Duration::from_millis(800));
                Response::from_data(vec![0x89, b'P', b'N', b'G'])
                    .with_header(header("Content-Type: image/png"))
            } else if path == "/html" {
                Response::from_string("<html></html>")
                    .with_header(header("Content-Type: text/html"))
            } else if path == "/missing" {
                Response::from_string("Not Found").with_status_code(404)
            } else if path == "/deny" {
                Response::from_string("").with_header(header("X-Frame-Options: DENY"))
            } else if path == "/csp" {
                Response::from_string("").with_header(header(
                    "Content-Security-Policy: default-src 'self'; frame-ancestors 'self'",
                ))
            } else if path == "/star" {
                Response::from_string("")
                    .with_header(header("Content-Security-Policy: frame-ancestors *"))
            } else {
                Response::from_string("open")
            };
            let _ = request.respond(response);
        }
    });

    format!("http://{}", addr)
}

fn fetcher() -> HttpSnapshotFetcher {
    HttpSnapshotFetcher::new("layoutlab-test", 5000).expect("client")
}

#[tokio::test]
async fn fetch_accepts_images() {
    let base = start_test_server();
    let image = fetcher()
        .fetch(&format!("{}/shot?viewport.width=390&", base))
        .await
        .expect("image");
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.extension(), "png");
    assert_eq!(image.data, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn fetch_rejects_non_images_and_errors() {
    let base = start_test_server();
    let f = fetcher();

    let res = f.fetch(&format!("{}/html", base)).await;
    assert!(matches!(res, Err(Error::SnapshotError(_))), "{:?}", res);

    let res = f.fetch(&format!("{}/missing", base)).await;
    assert!(matches!(res, Err(Error::SnapshotError(_))), "{:?}", res);

    // nothing listens on port 9 locally
    let res = f.fetch("http://127.0.0.1:9/shot").await;
    assert!(matches!(res, Err(Error::NetworkError(_))), "{:?}", res);

    let res = f.fetch("not a url").await;
    assert!(matches!(res, Err(Error::InvalidUrl(_))), "{:?}", res);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let base = start_test_server();
    let f = HttpSnapshotFetcher::new("layoutlab-test", 100).unwrap();
    let res = f.fetch(&format!("{}/slow", base)).await;
    assert!(matches!(res, Err(Error::Timeout(100))), "{:?}", res);
}

#[tokio::test]
async fn header_probe_reads_framing_policy() {
    let base = start_test_server();
    let probe = HeaderProbeClassifier::new("layoutlab-test", 5000).unwrap();

    assert!(probe.probe(&format!("{}/deny", base)).await.unwrap());
    assert!(probe.probe(&format!("{}/csp", base)).await.unwrap());
    assert!(!probe.probe(&format!("{}/star", base)).await.unwrap());
    assert!(!probe.probe(&format!("{}/open", base)).await.unwrap());
}

#[tokio::test]
async fn header_probe_never_overrides_the_lists() {
    let base = start_test_server();
    let probe = HeaderProbeClassifier::new("layoutlab-test", 5000).unwrap();

    // 127.0.0.1 is allow-listed, so the DENY header is never consulted
    assert_eq!(
        probe.classify(&format!("{}/deny", base)).await,
        RenderingStrategy::Live
    );
    assert_eq!(
        probe.classify("https://www.youtube.com/").await,
        RenderingStrategy::Snapshot
    );
}

#[tokio::test]
async fn header_probe_falls_back_on_failure() {
    let probe = HeaderProbeClassifier::new("layoutlab-test", 500).unwrap();
    // unlisted and unreachable: heuristic default
    assert_eq!(
        probe.classify("http://unreachable.invalid/").await,
        RenderingStrategy::Live
    );
}

#[tokio::test]
async fn driver_routes_real_fetch_failures_to_placeholders() {
    let base = start_test_server();
    let config = LabConfig {
        analysis_delay_ms: 0,
        snapshot_endpoint: format!("{}/shot", base),
        timeout_ms: 5000,
        ..Default::default()
    };
    let preview = Preview::new(config, layoutlab::HeuristicClassifier, fetcher())
        .await
        .unwrap();

    preview.submit("pinterest.com").await.unwrap();
    let board = preview.settled().await.unwrap();

    for frame in &board.frames {
        match frame.device {
            layoutlab::DeviceId::Tablet => {
                assert_eq!(frame.phase, FramePhase::Errored);
                assert!(matches!(frame.view, FrameView::Placeholder { .. }));
            }
            _ => {
                assert_eq!(frame.phase, FramePhase::Loaded, "{}", frame.device);
                assert_eq!(frame.image.as_ref().map(|i| i.data.len()), Some(4));
            }
        }
    }
}
