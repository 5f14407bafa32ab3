//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware::from_fn_with_state,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

use input_shield::config::{SanitizerConfig, ServiceConfig};
use input_shield::http::middleware::sanitize_request;
use input_shield::http::HttpServer;
use input_shield::lifecycle::Shutdown;
use input_shield::observability::audit::{AuditEvent, ChannelAuditSink};
use input_shield::SanitizationPipeline;

/// Handler that reflects what it received as JSON.
pub async fn echo(request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let headers: Map<String, Value> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                json!(String::from_utf8_lossy(value.as_bytes())),
            )
        })
        .collect();

    Json(json!({
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "headers": headers,
        "body": String::from_utf8_lossy(&bytes),
    }))
}

/// Start an echo upstream on an ephemeral port.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start the proxy in front of `upstream`; trigger the returned handle to stop it.
pub async fn start_shield(mut config: ServiceConfig, upstream: SocketAddr) -> (SocketAddr, Shutdown) {
    config.upstream.address = upstream.to_string();
    config.observability.metrics_enabled = false;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.signalled();
    tokio::spawn(async move {
        let _ = server.run_until(listener, signal).await;
    });
    (addr, shutdown)
}

/// The sanitization middleware in front of the echo handler, in-process.
pub fn echo_app(policy: SanitizerConfig) -> (Router, tokio::sync::mpsc::Receiver<AuditEvent>) {
    let (sink, rx) = ChannelAuditSink::new(64);
    let pipeline = Arc::new(SanitizationPipeline::new(Arc::new(policy), Arc::new(sink)));
    let app = Router::new()
        .fallback(echo)
        .layer(from_fn_with_state(pipeline, sanitize_request));
    (app, rx)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
