use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use brandkit_client::{OpenAiBackend, ReqwestFetcher};
use brandkit_core::{MemoryStore, PipelineConfig};
use brandkit_db::AnyStore;
use brandkit_server::routes;
use brandkit_server::state::{AppState, build_pipeline};

pub const TEST_API_KEY: &str = "test-secret-key";
pub const GENERATED_COPY: &str = "Fresh bread, baked before sunrise.";

const SITE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Example Co | Home</title>
  <meta name="description" content="Fresh bread baked daily.">
  <script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "Bakery", "name": "Example Co",
     "description": "Fresh bread baked daily.", "email": "hello@example.com"}
  </script>
</head>
<body>
  <h1>Example Co</h1>
  <p>We bake sourdough every morning.</p>
</body>
</html>"#;

/// The router under test plus the base URL of the fake website and LLM.
pub struct TestApp {
    pub router: Router,
    pub upstream: String,
}

impl TestApp {
    pub fn site_url(&self) -> String {
        format!("{}/site", self.upstream)
    }

    pub fn empty_site_url(&self) -> String {
        format!("{}/empty", self.upstream)
    }

    /// Sends an authenticated request and returns status plus raw body.
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TEST_API_KEY}"));
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub async fn call_json(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = self.call(method, uri, body).await;
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Creates a project for the fake site and returns its id.
    pub async fn create_project(&self) -> String {
        let (status, json) = self
            .call_json(
                "POST",
                "/v1/projects",
                Some(serde_json::json!({"url": self.site_url()})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["project_id"].as_str().unwrap().to_string()
    }
}

/// Fake LLM: social posts fail with a 500, everything else gets fixed copy.
async fn chat_completions(axum::Json(request): axum::Json<serde_json::Value>) -> impl IntoResponse {
    let user = request["messages"][1]["content"].as_str().unwrap_or_default();
    if user.contains("social media post") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({"error": {"message": "model overloaded"}})),
        );
    }
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": GENERATED_COPY}}]
        })),
    )
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/site", get(|| async { Html(SITE_HTML) }))
        .route("/empty", get(|| async { Html("<html><body></body></html>") }))
        .route("/v1/chat/completions", post(chat_completions));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock upstream failed");
    });

    format!("http://{addr}")
}

/// Builds the real router over an in-memory store, with the fetcher and LLM
/// backend pointed at a local mock upstream.
pub async fn setup_test_app() -> TestApp {
    let upstream = spawn_upstream().await;

    let fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(5))
        .unwrap()
        .allow_private_urls();
    let backend =
        OpenAiBackend::with_base_url("test-llm-key", "mock-model", &format!("{upstream}/v1"))
            .unwrap();
    let config = PipelineConfig::default()
        .with_scan_timeout(Duration::from_secs(10))
        .with_generation_timeout(Duration::from_secs(10));

    let pipeline = build_pipeline(AnyStore::from(MemoryStore::new()), fetcher, backend, config);
    let state = Arc::new(AppState::new(pipeline, TEST_API_KEY));

    TestApp {
        router: routes::router(state),
        upstream,
    }
}
