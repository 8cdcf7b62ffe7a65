//! Router tests against a stub renderer: no browser, no network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use reelgrab::{
    create_router, AllowList, AppState, DeviceProfile, PageRenderer, Pipeline, RenderError,
    RenderedDocument, RouterOptions, VideoService,
};

enum Page {
    Html(&'static str),
    Fails,
}

struct StubRenderer {
    page: Page,
    calls: AtomicUsize,
}

impl StubRenderer {
    fn new(page: Page) -> Arc<Self> {
        Arc::new(Self {
            page,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn render(
        &self,
        url: &Url,
        _profile: &DeviceProfile,
    ) -> Result<RenderedDocument, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.page {
            Page::Html(html) => Ok(RenderedDocument::from_html(url.as_str(), html)),
            Page::Fails => Err(RenderError::Timeout(Duration::from_secs(30))),
        }
    }
}

fn app(renderer: &Arc<StubRenderer>) -> Router {
    app_with(renderer, RouterOptions::default())
}

fn app_with(renderer: &Arc<StubRenderer>, options: RouterOptions) -> Router {
    let service = VideoService::new(
        Arc::clone(renderer) as Arc<dyn PageRenderer>,
        Pipeline::default(),
        DeviceProfile::default(),
        AllowList::default(),
    );
    create_router(AppState::new(service), &options)
}

fn post_fetch(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/fetch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let renderer = StubRenderer::new(Page::Fails);
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(&renderer), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn resolves_video_element() {
    let renderer = StubRenderer::new(Page::Html(
        r#"<html><body><video src="https://x.cdn/v1.mp4"></video></body></html>"#,
    ));

    let (status, body) = send(
        app(&renderer),
        post_fetch(r#"{"url":"https://instagram.com/reel/abc"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["video_url"], "https://x.cdn/v1.mp4");
    assert_eq!(body["filename"], "v1.mp4");
    assert_eq!(body["debug"]["found"], true);
    assert_eq!(body["debug"]["methods"]["video_src"], "https://x.cdn/v1.mp4");
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn unsupported_host_never_reaches_renderer() {
    let renderer = StubRenderer::new(Page::Html("<video src=\"https://x.cdn/v.mp4\"></video>"));

    let (status, body) = send(
        app(&renderer),
        post_fetch(r#"{"url":"https://example.com/x"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Only Instagram / Facebook URLs supported"}));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn missing_or_invalid_url_is_bad_request() {
    let renderer = StubRenderer::new(Page::Fails);

    for (payload, message) in [
        (r"{}", "No url provided"),
        (r#"{"url": 7}"#, "No url provided"),
        (r"not json", "No url provided"),
        (r#"{"url":"::::"}"#, "Invalid URL"),
    ] {
        let (status, body) = send(app(&renderer), post_fetch(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], message, "{payload}");
    }

    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn nothing_found_is_not_found_with_trace() {
    let renderer = StubRenderer::new(Page::Html(
        "<html><body><p>This content isn't available</p></body></html>",
    ));

    let (status, body) = send(
        app(&renderer),
        post_fetch(r#"{"url":"https://www.facebook.com/watch/?v=1"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({
            "error": "Video not found / private or blocked",
            "debug": {"found": false, "methods": {}}
        })
    );
}

#[tokio::test]
async fn protocol_relative_candidate_is_not_found_but_traced() {
    let renderer = StubRenderer::new(Page::Html(
        r#"<meta property="og:video" content="//cdn.example.com/v.mp4">"#,
    ));

    let (status, body) = send(
        app(&renderer),
        post_fetch(r#"{"url":"https://instagram.com/p/XYZ"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["debug"]["found"], false);
    assert_eq!(body["debug"]["methods"]["og_video"], "//cdn.example.com/v.mp4");
}

#[tokio::test]
async fn render_failure_is_server_error() {
    let renderer = StubRenderer::new(Page::Fails);

    let (status, body) = send(
        app(&renderer),
        post_fetch(r#"{"url":"https://instagram.com/reel/abc"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error fetching remote page");
    assert_eq!(body["detail"], "navigation timed out after 30s");
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let renderer = StubRenderer::new(Page::Fails);
    let options = RouterOptions {
        max_body_bytes: 64,
        ..RouterOptions::default()
    };
    let padding = "a".repeat(256);
    let payload = format!(r#"{{"url":"https://instagram.com/reel/{padding}"}}"#);

    let response = app_with(&renderer, options)
        .oneshot(post_fetch(payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let renderer = StubRenderer::new(Page::Fails);
    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app(&renderer).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn static_directory_serves_other_paths() {
    let dir = std::env::temp_dir().join(format!("reelgrab-static-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>reelgrab</h1>").unwrap();

    let renderer = StubRenderer::new(Page::Fails);
    let options = RouterOptions {
        static_dir: Some(dir.clone()),
        ..RouterOptions::default()
    };
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app_with(&renderer, options).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], b"<h1>reelgrab</h1>");
}
