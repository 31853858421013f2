//! End-to-end tests for `Extractor`.
//!
//! Pages are served by `wiremock`; the browser is replaced by a scripted
//! `PageRenderer` so escalation paths can be exercised without Chromium.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prodex_core::{Availability, ProductRecord, Provenance, RawDocument};
use prodex_extractor::{
    AttemptOutcome, ErrorKind, Extractor, ExtractorError, ExtractorSettings, FetchMode,
    PageRenderer, RenderPhase, Stage,
};

/// Stand-in browser. `full_html: None` makes full renders fail; `quick: None`
/// makes quick reads time out waiting for selectors.
#[derive(Default)]
struct ScriptedRenderer {
    full_html: Option<String>,
    full_delay: Option<Duration>,
    quick: Option<ProductRecord>,
    full_calls: AtomicU32,
    quick_calls: AtomicU32,
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render_full(&self, url: &str) -> Result<RawDocument, ExtractorError> {
        self.full_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.full_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.full_html {
            Some(html) => Ok(RawDocument::new(html.clone(), Provenance::Rendered)),
            None => Err(ExtractorError::Browser(format!("no browser for {url}"))),
        }
    }

    async fn render_quick(&self, url: &str) -> Result<ProductRecord, ExtractorError> {
        self.quick_calls.fetch_add(1, Ordering::SeqCst);
        self.quick.clone().ok_or_else(|| ExtractorError::RenderTimeout {
            url: url.to_owned(),
            phase: RenderPhase::SelectorWait,
        })
    }
}

fn test_settings() -> ExtractorSettings {
    ExtractorSettings {
        user_agent: "prodex-test/0.1".to_string(),
        static_timeout: Duration::from_secs(5),
        request_deadline: Duration::from_secs(20),
        fetch_max_retries: 0,
        fetch_backoff_base_ms: 0,
        ..ExtractorSettings::default()
    }
}

fn extractor_with(renderer: &Arc<ScriptedRenderer>) -> Extractor {
    let renderer: Arc<dyn PageRenderer> = renderer.clone();
    Extractor::with_renderer(&test_settings(), renderer).expect("failed to build test Extractor")
}

async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn open_graph_page_terminates_at_meta_stage() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/p/widget",
        200,
        r#"<html><head>
            <meta property="og:title" content="Widget">
            <meta property="product:price:amount" content="49.99">
        </head><body><p>Buy now</p></body></html>"#,
    )
    .await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/widget", server.uri()), FetchMode::Escalate)
        .await
        .expect("extraction");

    assert_eq!(extraction.stage, Stage::Meta);
    assert_eq!(extraction.provenance, Provenance::Static);
    assert_eq!(
        extraction.record,
        ProductRecord {
            name: Some("Widget".to_string()),
            description: None,
            images: Vec::new(),
            price: Some(dec("49.99")),
            availability: None,
        }
    );
    assert_eq!(renderer.full_calls.load(Ordering::SeqCst), 0);
    assert_eq!(renderer.quick_calls.load(Ordering::SeqCst), 0);

    let json = serde_json::to_value(&extraction.record).expect("serialize");
    assert_eq!(json["price"].as_f64(), Some(49.99));
    assert!(json["availability"].is_null());
    assert!(json["description"].is_null());
}

#[tokio::test]
async fn linked_data_outranks_meta_and_text() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/p/mug",
        200,
        r#"<html><head>
            <meta property="og:title" content="Meta Mug">
            <meta property="product:price:amount" content="5.00">
            <script type="application/ld+json">
              {"@context":"https://schema.org","@type":"Product","name":"Linked Mug",
               "image":["https://cdn.example.com/mug.jpg"],
               "offers":{"price":"35.00","availability":"https://schema.org/OutOfStock"}}
            </script>
        </head><body><h1>Heading Mug</h1><p>Now 12 SAR, in stock</p></body></html>"#,
    )
    .await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/mug", server.uri()), FetchMode::Escalate)
        .await
        .expect("extraction");

    assert_eq!(extraction.stage, Stage::Structured);
    assert_eq!(extraction.attempts.len(), 1);
    let record = extraction.record;
    assert_eq!(record.name.as_deref(), Some("Linked Mug"));
    assert_eq!(record.price, Some(dec("35")));
    assert_eq!(record.availability, Some(Availability::OutOfStock));
    assert_eq!(record.images, vec!["https://cdn.example.com/mug.jpg"]);
}

#[tokio::test]
async fn markerless_page_is_parsed_from_partial_render() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/p/spa",
        200,
        r#"<html><head><title>Loading</title></head><body><div id="app"></div></body></html>"#,
    )
    .await;

    // The render's selector wait ran out, so the DOM is whatever had loaded.
    let renderer = Arc::new(ScriptedRenderer {
        full_html: Some(
            "<html><body><h1>Desk Lamp</h1><span>Only 89.00 SAR</span></body></html>".to_string(),
        ),
        ..ScriptedRenderer::default()
    });
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/spa", server.uri()), FetchMode::Escalate)
        .await
        .expect("partial render must not fail the request");

    assert_eq!(renderer.full_calls.load(Ordering::SeqCst), 1);
    assert_eq!(extraction.provenance, Provenance::Rendered);
    assert_eq!(extraction.stage, Stage::Heuristic);
    assert_eq!(extraction.record.name.as_deref(), Some("Desk Lamp"));
    assert_eq!(extraction.record.price, Some(dec("89")));
}

#[tokio::test]
async fn static_only_surfaces_missing_markers() {
    let server = MockServer::start().await;
    serve(&server, "/p/plain", 200, "<html><body><p>Nothing here</p></body></html>").await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let result = extractor_with(&renderer)
        .extract_with_mode(&format!("{}/p/plain", server.uri()), FetchMode::StaticOnly)
        .await;

    let err = result.expect_err("static-only fetch of a markerless page must fail");
    assert_eq!(err.kind(), ErrorKind::NoMarkers);
    assert_eq!(renderer.full_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_fails_when_static_and_render_both_fail() {
    let server = MockServer::start().await;
    serve(&server, "/p/down", 503, r#"<meta property="og:title" content="x">"#).await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let err = extractor_with(&renderer)
        .extract(&format!("{}/p/down", server.uri()))
        .await
        .expect_err("both fetch paths failed");

    assert_eq!(err.kind(), ErrorKind::Browser);
    assert_eq!(renderer.full_calls.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.quick_calls.load(Ordering::SeqCst), 0);
}

const NO_SIGNAL_PAGE: &str = r#"<html><head>
    <title>Journal</title>
    <script type="application/json">{"locale": "ar", "currency": "SAR"}</script>
</head><body>
    <nav><a href="/">Home</a></nav>
    <article>
      <p>Handmade ceramic mug, glazed by hand in small batches.</p>
      <img src="https://cdn.example.com/mug-1.jpg">
      <img src="/relative.jpg">
      <img src="https://cdn.example.com/mug-2.jpg">
    </article>
</body></html>"#;

#[tokio::test]
async fn quick_render_is_used_before_text_fallback() {
    let server = MockServer::start().await;
    serve(&server, "/p/quiet", 200, NO_SIGNAL_PAGE).await;

    let renderer = Arc::new(ScriptedRenderer {
        quick: Some(ProductRecord {
            name: Some("Ceramic Mug".to_string()),
            price: Some(dec("45")),
            ..ProductRecord::default()
        }),
        ..ScriptedRenderer::default()
    });
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/quiet", server.uri()), FetchMode::Escalate)
        .await
        .expect("extraction");

    assert_eq!(extraction.stage, Stage::DynamicQuick);
    assert_eq!(extraction.record.name.as_deref(), Some("Ceramic Mug"));
    let stages: Vec<Stage> = extraction.attempts.iter().map(|a| a.stage).collect();
    assert_eq!(
        stages,
        vec![Stage::Structured, Stage::Meta, Stage::Heuristic, Stage::DynamicQuick]
    );
}

#[tokio::test]
async fn text_fallback_recovers_description_and_images() {
    let server = MockServer::start().await;
    serve(&server, "/p/quiet", 200, NO_SIGNAL_PAGE).await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/quiet", server.uri()), FetchMode::Escalate)
        .await
        .expect("fallback never fails");

    assert_eq!(extraction.stage, Stage::TextFallback);
    assert_eq!(renderer.quick_calls.load(Ordering::SeqCst), 1);

    let quick = &extraction.attempts[3];
    assert_eq!(quick.stage, Stage::DynamicQuick);
    assert_eq!(quick.outcome, AttemptOutcome::NoSignal);

    let record = extraction.record;
    assert_eq!(record.name, None);
    assert_eq!(record.price, None);
    assert_eq!(record.availability, None);
    assert_eq!(
        record.images,
        vec!["https://cdn.example.com/mug-1.jpg", "https://cdn.example.com/mug-2.jpg"]
    );
    let description = record.description.expect("readable description");
    assert!(description.contains("Handmade ceramic mug"));
    assert!(!description.contains("Home"));
}

#[tokio::test]
async fn static_only_skips_quick_render() {
    let server = MockServer::start().await;
    serve(&server, "/p/quiet", 200, NO_SIGNAL_PAGE).await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let extraction = extractor_with(&renderer)
        .extract_traced(&format!("{}/p/quiet", server.uri()), FetchMode::StaticOnly)
        .await
        .expect("extraction");

    assert_eq!(extraction.stage, Stage::TextFallback);
    assert_eq!(renderer.quick_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_extraction_is_identical() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/p/stable",
        200,
        r#"<script type="application/json" id="ProductJson-main">
           {"title":"Dates Box","body_html":"<p>Sukkari</p>","images":["https://cdn.example.com/d.jpg"],
            "variants":[{"price":"60.00","available":true}]}
           </script>"#,
    )
    .await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let extractor = extractor_with(&renderer);
    let url = format!("{}/p/stable", server.uri());

    let first = extractor.extract(&url).await.expect("first");
    let second = extractor.extract(&url).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.availability, Some(Availability::InStock));
}

#[tokio::test]
async fn request_deadline_aborts_slow_render() {
    let server = MockServer::start().await;
    serve(&server, "/p/slow", 200, "<html><body>plain</body></html>").await;

    let renderer = Arc::new(ScriptedRenderer {
        full_html: Some("<h1>late</h1>".to_string()),
        full_delay: Some(Duration::from_secs(5)),
        ..ScriptedRenderer::default()
    });
    let settings = ExtractorSettings {
        request_deadline: Duration::from_millis(300),
        ..test_settings()
    };
    let dyn_renderer: Arc<dyn PageRenderer> = renderer.clone();
    let extractor = Extractor::with_renderer(&settings, dyn_renderer).expect("extractor");

    let err = extractor
        .extract(&format!("{}/p/slow", server.uri()))
        .await
        .expect_err("deadline must fire");
    assert!(
        matches!(err, ExtractorError::DeadlineExceeded { .. }),
        "expected DeadlineExceeded, got: {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn invalid_url_is_rejected_before_fetching() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let err = extractor_with(&renderer)
        .extract("ftp://shop.example.com/p/1")
        .await
        .expect_err("invalid url");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(renderer.full_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn field_report_lists_page_fields() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/p/fields",
        200,
        r#"<meta property="og:title" content="Widget"><span itemprop="sku">W-1</span>"#,
    )
    .await;

    let renderer = Arc::new(ScriptedRenderer::default());
    let report = extractor_with(&renderer)
        .describe_fields(&format!("{}/p/fields", server.uri()), FetchMode::Escalate)
        .await
        .expect("report");

    assert!(report.linked_data.is_empty());
    assert_eq!(report.itemprops[0].name, "sku");
    assert_eq!(report.itemprops[0].values, vec!["W-1"]);
    assert_eq!(report.meta[0].key, "og:title");
}
