//! Shared test helpers: an axum stand-in for the classification service.
//!
//! Each request gets the next queued (status, JSON body) response. Uploads
//! to `/predict` are decoded with the `Multipart` extractor and history
//! requests with `Query`, so tests assert on what the client actually
//! sent rather than on raw bytes.

#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One multipart field as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub content_type: Option<String>,
    pub parts: Vec<UploadedPart>,
}

impl RecordedRequest {
    pub fn part(&self, name: &str) -> Option<&UploadedPart> {
        self.parts.iter().find(|p| p.name == name)
    }
}

struct MockState {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    fn reply(&self, request: RecordedRequest) -> Response {
        self.requests.lock().unwrap().push(request);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((404, r#"{"detail":"no canned response"}"#.to_string()));
        let status = StatusCode::from_u16(status).expect("canned status must be valid");
        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Serve `responses` in order. Once they run out every request gets a 404.
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        let state = Arc::new(MockState {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/predict", post(predict))
            .route("/predictions", get(predictions))
            .fallback(other)
            .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A URL on a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn predict(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("malformed multipart body") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("truncated multipart field").to_vec();
        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.reply(RecordedRequest {
        method: Method::POST,
        path: "/predict".to_string(),
        query: HashMap::new(),
        content_type: content_type(&headers),
        parts,
    })
}

async fn predictions(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.reply(RecordedRequest {
        method: Method::GET,
        path: "/predictions".to_string(),
        query,
        content_type: None,
        parts: Vec::new(),
    })
}

async fn other(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.reply(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query,
        content_type: content_type(&headers),
        parts: Vec::new(),
    })
}
