//! In-process tests of the sanitization middleware.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use input_shield::config::SanitizerConfig;
use input_shield::observability::audit::AuditEventType;

mod common;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, content_type: &str, body: impl Into<String>) -> Request<Body> {
    let body = body.into();
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_sql_injection_in_json_is_blocked_without_details() {
    let (app, mut audit) = common::echo_app(SanitizerConfig::default());
    let body = r#"{"query":"1'; DROP TABLE users; --"}"#;

    let (status, json) = send(app, post("/api/search", "application/json", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "input_validation_failed");
    assert!(json.get("details").is_none());
    assert!(json["timestamp"].is_string());

    let first = audit.try_recv().unwrap();
    assert_eq!(first.event_type, AuditEventType::InjectionDetected);
    let mut saw_block = false;
    while let Ok(event) = audit.try_recv() {
        saw_block |= event.event_type == AuditEventType::RequestBlocked;
    }
    assert!(saw_block);
}

#[tokio::test]
async fn test_block_includes_details_when_enabled() {
    let (app, _audit) = common::echo_app(SanitizerConfig {
        include_detection_details_in_error_response: true,
        ..SanitizerConfig::default()
    });
    let body = r#"{"query":"1'; DROP TABLE users; --"}"#;

    let (status, json) = send(app, post("/api/search", "application/json", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["injectionType"], "sql_injection");
    assert!(json["details"]["riskLevel"] == "high" || json["details"]["riskLevel"] == "critical");
    assert!(!json["details"]["detectedPatterns"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_blocking_policy_sanitizes_json_leaves() {
    let (app, _audit) = common::echo_app(SanitizerConfig {
        block_on_injection_detection: false,
        ..SanitizerConfig::default()
    });
    let body = r#"{"name":"<script>alert(1)</script>","age":5,"tags":["ok"]}"#;

    let (status, echoed) = send(app, post("/users", "application/json", body)).await;

    assert_eq!(status, StatusCode::OK);
    let forwarded: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert!(!forwarded["name"].as_str().unwrap().contains("<script"));
    assert_eq!(forwarded["age"], 5);
    assert_eq!(forwarded["tags"][0], "ok");
    assert_eq!(
        echoed["headers"]["content-length"],
        echoed["body"].as_str().unwrap().len().to_string()
    );
}

#[tokio::test]
async fn test_low_risk_detection_passes_default_threshold() {
    let (app, mut audit) = common::echo_app(SanitizerConfig::default());

    let (status, echoed) = send(app, get("/page?tpl=%7B%7Bname%7D%7D")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(echoed["uri"].as_str().unwrap().starts_with("/page?tpl="));
    assert_eq!(audit.try_recv().unwrap().event_type, AuditEventType::InjectionDetected);
}

#[tokio::test]
async fn test_excluded_path_and_method_skip_inspection() {
    let (app, mut audit) = common::echo_app(SanitizerConfig::default());
    let (status, echoed) = send(app, get("/health?q=%3Cscript%3Ealert(1)%3C/script%3E")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["uri"], "/health?q=%3Cscript%3Ealert(1)%3C/script%3E");

    let (app, _) = common::echo_app(SanitizerConfig::default());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api?q=%3Cscript%3E")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(audit.try_recv().is_err());
}

#[tokio::test]
async fn test_static_asset_extension_is_skipped() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let (status, _) = send(app, get("/assets/app.JS?v=%3Cscript%3E")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_excluded_content_type_body_forwarded_untouched() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let body = "--b\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\n<script>alert(1)</script>\r\n--b--\r\n";

    let (status, echoed) = send(app, post("/upload", "multipart/form-data; boundary=b", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["body"], body);
}

#[tokio::test]
async fn test_excluded_content_type_still_inspects_query() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let request = post(
        "/upload?cmd=%3B%20cat%20%2Fetc%2Fpasswd",
        "application/octet-stream",
        "binary",
    );
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_allow_listed_headers_are_inspected() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, "Mozilla/5.0 <script>alert(1)</script>")
        .body(Body::empty())
        .unwrap();
    let (status, echoed) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["headers"]["user-agent"], "Mozilla/5.0 <script>alert(1)</script>");

    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let request = Request::builder()
        .uri("/")
        .header(header::REFERER, "https://x.test/<script>alert(1)</script>")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_form_fields_are_sanitized() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let body = "comment=%3Cb%3Ehello%3C%2Fb%3E&page=2";

    let (status, echoed) = send(app, post("/comments", "application/x-www-form-urlencoded", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["body"], "comment=hello&page=2");
}

#[tokio::test]
async fn test_xml_declarations_are_stripped() {
    let (app, _audit) = common::echo_app(SanitizerConfig::default());
    let body = r#"<?xml version="1.0"?><!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><foo>&xxe;</foo>"#;

    let (status, echoed) = send(app, post("/import", "application/xml", body)).await;

    assert_eq!(status, StatusCode::OK);
    let forwarded = echoed["body"].as_str().unwrap();
    assert!(!forwarded.contains("DOCTYPE"));
    assert!(!forwarded.contains("ENTITY"));
    assert!(!forwarded.contains("&xxe;"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (app, _audit) = common::echo_app(SanitizerConfig {
        max_request_body_size: 64,
        ..SanitizerConfig::default()
    });
    let body = format!(r#"{{"comment":"{}"}}"#, "a".repeat(1024));

    let (status, json) = send(app, post("/api", "application/json", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "input_validation_failed");
    assert_eq!(json["message"], "Request body exceeds the allowed size");
}

#[tokio::test]
async fn test_disabled_pipeline_forwards_everything() {
    let (app, _audit) = common::echo_app(SanitizerConfig {
        enabled: false,
        ..SanitizerConfig::default()
    });
    let body = r#"{"query":"1'; DROP TABLE users; --"}"#;

    let (status, echoed) = send(app, post("/api", "application/json", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["body"], body);
}
