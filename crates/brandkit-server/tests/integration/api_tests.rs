use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::{GENERATED_COPY, TEST_API_KEY, setup_test_app};

// ---------------------------------------------------------------------------
// System & auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/v1/projects/{id}/generate"].is_object());
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(Request::get("/v1/projects").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_returns_401_before_touching_the_pipeline() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/v1/projects")
                .header("authorization", "Bearer wrong-key")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url":"https://example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, json) = app.call_json("GET", "/v1/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_get_and_list_projects() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    let (status, json) = app.call_json("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["stage"], "created");
    assert_eq!(json["name"], "127.0.0.1");
    assert!(json["last_failure"].is_null());

    let (status, json) = app.call_json("GET", "/v1/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["projects"][0]["id"], id.as_str());

    let (status, json) = app
        .call_json("GET", &format!("/v1/projects/{id}/outputs"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn invalid_url_returns_400() {
    let app = setup_test_app().await;

    let (status, json) = app
        .call_json(
            "POST",
            "/v1/projects",
            Some(serde_json::json!({"url": "ftp://example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
}

#[tokio::test]
async fn malformed_requests_get_a_json_error_body() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/v1/projects")
                .header("authorization", format!("Bearer {TEST_API_KEY}"))
                .header("content-type", "application/json")
                .body(Body::from("{\"url\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_input");
    assert!(json["message"].as_str().unwrap().starts_with("Invalid input"));

    let (status, json) = app
        .call_json("POST", "/v1/projects", Some(serde_json::json!({"name": "No url"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");

    let (status, json) = app.call_json("GET", "/v1/projects/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
}

#[tokio::test]
async fn unknown_project_returns_404() {
    let app = setup_test_app().await;
    let missing = uuid::Uuid::new_v4();

    for (method, uri) in [
        ("GET", format!("/v1/projects/{missing}")),
        ("DELETE", format!("/v1/projects/{missing}")),
        ("GET", format!("/v1/projects/{missing}/profile")),
        ("POST", format!("/v1/projects/{missing}/scan")),
    ] {
        let (status, json) = app.call_json(method, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(json["error"], "not_found", "{method} {uri}");
    }
}

// ---------------------------------------------------------------------------
// Scan & profile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn profile_before_scan_is_not_scanned() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    let (status, json) = app
        .call_json("GET", &format!("/v1/projects/{id}/profile"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_scanned");
}

#[tokio::test]
async fn scan_builds_a_full_profile() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    let (status, json) = app
        .call_json("POST", &format!("/v1/projects/{id}/scan"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["facts"]["name"], "Example Co");
    assert_eq!(json["facts"]["email"], "hello@example.com");
    assert_eq!(json["completeness"], "full");

    let (status, profile) = app
        .call_json("GET", &format!("/v1/projects/{id}/profile"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["fingerprint"], json["fingerprint"]);

    let (_, project) = app.call_json("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(project["stage"], "profiled");
}

#[tokio::test]
async fn unusable_site_fails_the_scan_and_records_it() {
    let app = setup_test_app().await;
    let (_, created) = app
        .call_json(
            "POST",
            "/v1/projects",
            Some(serde_json::json!({"url": app.empty_site_url(), "name": "Empty"})),
        )
        .await;
    let id = created["project_id"].as_str().unwrap().to_string();

    let (status, json) = app
        .call_json("POST", &format!("/v1/projects/{id}/scan"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "upstream_failure");
    assert_eq!(json["reason"], "unusable_content");

    let (_, project) = app.call_json("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(project["stage"], "created");
    assert_eq!(project["last_failure"]["stage"], "scan");
    assert_eq!(project["last_failure"]["reason"], "unusable_content");
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_without_profile_is_precondition_failed() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    let (status, json) = app
        .call_json(
            "POST",
            &format!("/v1/projects/{id}/generate"),
            Some(serde_json::json!({"output_types": ["ad_copy"], "language": "en"})),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(json["error"], "precondition_failed");

    let (_, outputs) = app
        .call_json("GET", &format!("/v1/projects/{id}/outputs"), None)
        .await;
    assert_eq!(outputs["total"], 0);
}

#[tokio::test]
async fn unknown_output_type_returns_400() {
    let app = setup_test_app().await;
    let id = app.create_project().await;
    app.call("POST", &format!("/v1/projects/{id}/scan"), None).await;

    let (status, json) = app
        .call_json(
            "POST",
            &format!("/v1/projects/{id}/generate"),
            Some(serde_json::json!({"output_types": ["billboard"], "language": "en"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
}

#[tokio::test]
async fn partial_generation_reports_successes_and_failures() {
    let app = setup_test_app().await;
    let id = app.create_project().await;
    let (status, _) = app.call("POST", &format!("/v1/projects/{id}/scan"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = app
        .call_json(
            "POST",
            &format!("/v1/projects/{id}/generate"),
            Some(serde_json::json!({
                "output_types": ["ad_copy", "social_post"],
                "optional_details": {"tone": "playful"},
                "language": "en"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["outputs"]["ad_copy"], GENERATED_COPY);
    assert!(report["outputs"].get("social_post").is_none());
    assert_eq!(report["failures"]["social_post"]["reason"], "server_error");

    let (_, outputs) = app
        .call_json("GET", &format!("/v1/projects/{id}/outputs"), None)
        .await;
    let statuses: Vec<(String, String)> = outputs["outputs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| {
            (
                o["output_type"].as_str().unwrap().to_string(),
                o["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("ad_copy".to_string(), "succeeded".to_string()),
            ("social_post".to_string(), "failed".to_string()),
        ]
    );

    let (_, project) = app.call_json("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(project["stage"], "generated");
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_without_outputs_is_precondition_failed() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    let (status, json) = app
        .call_json("GET", &format!("/v1/projects/{id}/export?format=html"), None)
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(json["error"], "precondition_failed");
}

#[tokio::test]
async fn export_rejects_unknown_or_missing_format() {
    let app = setup_test_app().await;
    let id = app.create_project().await;

    for uri in [
        format!("/v1/projects/{id}/export?format=odt"),
        format!("/v1/projects/{id}/export"),
    ] {
        let (status, json) = app.call_json("GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "invalid_input");
    }
}

#[tokio::test]
async fn scan_generate_export_end_to_end() {
    let app = setup_test_app().await;
    let id = app.create_project().await;
    app.call("POST", &format!("/v1/projects/{id}/scan"), None).await;
    let (status, _) = app
        .call(
            "POST",
            &format!("/v1/projects/{id}/generate"),
            Some(serde_json::json!({"output_types": ["ad_copy"], "language": "en"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/v1/projects/{id}/export?format=pdf"))
                .header("authorization", format!("Bearer {TEST_API_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"127-0-0-1.pdf\""
    );
    let pdf = response.into_body().collect().await.unwrap().to_bytes();
    assert!(pdf.starts_with(b"%PDF"));

    let (status, first) = app
        .call("GET", &format!("/v1/projects/{id}/export?format=html"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app
        .call("GET", &format!("/v1/projects/{id}/export?format=html"), None)
        .await;
    assert_eq!(first, second);
    let html = String::from_utf8(first).unwrap();
    assert_eq!(html.matches("<section").count(), 1);
    assert!(html.contains(GENERATED_COPY));

    let (status, docx) = app
        .call("GET", &format!("/v1/projects/{id}/export?format=docx"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(docx.starts_with(b"PK"));
}

#[tokio::test]
async fn delete_removes_project_profile_and_outputs() {
    let app = setup_test_app().await;
    let id = app.create_project().await;
    app.call("POST", &format!("/v1/projects/{id}/scan"), None).await;
    app.call(
        "POST",
        &format!("/v1/projects/{id}/generate"),
        Some(serde_json::json!({"output_types": ["tagline"], "language": "de"})),
    )
    .await;

    let (status, _) = app.call("DELETE", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call("GET", &format!("/v1/projects/{id}/outputs"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
