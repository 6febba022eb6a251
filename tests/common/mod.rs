//! Shared test fixtures: a scripted stand-in for the scanning service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};

pub const TEST_API_KEY: &str = "test-api-key";

/// Scripted fake of the scanning service's `/api/v3` routes.
#[derive(Default)]
pub struct FakeScanner {
    /// Analysis payloads handed out in order; once empty, `fallback` repeats.
    pub script: Mutex<VecDeque<Value>>,
    pub fallback: Mutex<Option<Value>>,
    pub poll_calls: AtomicU32,
    pub submit_calls: AtomicU32,
    pub submitted_urls: Mutex<Vec<String>>,
    pub uploaded: Mutex<Vec<(String, usize)>>,
}

impl FakeScanner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, payload: Value) {
        self.script.lock().unwrap().push_back(payload);
    }

    pub fn set_fallback(&self, payload: Value) {
        *self.fallback.lock().unwrap() = Some(payload);
    }

    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

pub fn analysis(status: &str) -> Value {
    json!({
        "data": {
            "id": "analysis-1",
            "type": "analysis",
            "attributes": { "status": status }
        }
    })
}

pub fn completed_analysis() -> Value {
    json!({
        "data": {
            "id": "analysis-1",
            "type": "analysis",
            "attributes": {
                "status": "completed",
                "stats": {
                    "malicious": 2,
                    "suspicious": 1,
                    "harmless": 57,
                    "undetected": 10
                },
                "results": {
                    "Acme AV": { "category": "malicious", "result": "phishing" },
                    "Blue Shield": { "category": "harmless", "result": "clean" }
                }
            }
        }
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-apikey")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == TEST_API_KEY)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "WrongCredentialsError", "message": "Wrong API key"}})),
    )
        .into_response()
}

async fn submit_url(
    State(fake): State<Arc<FakeScanner>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.submit_calls.fetch_add(1, Ordering::SeqCst);
    let url = form.get("url").cloned().unwrap_or_default();
    fake.submitted_urls.lock().unwrap().push(url);
    Json(json!({"data": {"type": "analysis", "id": "u-analysis-1"}})).into_response()
}

async fn submit_file(
    State(fake): State<Arc<FakeScanner>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.submit_calls.fetch_add(1, Ordering::SeqCst);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            fake.uploaded.lock().unwrap().push((name, len));
        }
    }
    Json(json!({"data": {"type": "analysis", "id": "f-analysis-1"}})).into_response()
}

async fn get_analysis(
    State(fake): State<Arc<FakeScanner>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.poll_calls.fetch_add(1, Ordering::SeqCst);
    let next = fake.script.lock().unwrap().pop_front();
    let payload = next
        .or_else(|| fake.fallback.lock().unwrap().clone())
        .unwrap_or_else(|| analysis("queued"));
    Json(payload).into_response()
}

/// Start the fake on an ephemeral port. Returns its `/api/v3` base URL.
pub async fn spawn_fake_scanner(fake: Arc<FakeScanner>) -> String {
    let app = Router::new()
        .route("/api/v3/urls", post(submit_url))
        .route(
            "/api/v3/files",
            post(submit_file).layer(DefaultBodyLimit::max(64 * 1024 * 1024)),
        )
        .route("/api/v3/analyses/{id}", get(get_analysis))
        .with_state(fake);

    let addr = spawn_router(app).await;
    format!("http://{}/api/v3", addr)
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_router(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}
