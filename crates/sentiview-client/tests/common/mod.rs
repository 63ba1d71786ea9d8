//! Common test utilities: an in-process backend double.
//!
//! [`Backend`] serves canned JSON per path over real HTTP and records every
//! request it receives, so tests can assert on what actually went over the
//! wire.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::Json;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use sentiview_client::{ClientConfig, SentiviewClient};

/// Token the test client authenticates with.
pub const TOKEN: &str = "test-token";

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Decoded query pairs, in wire order.
    pub query: Vec<(String, String)>,
    /// Bearer token, if any.
    pub bearer: Option<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl Recorded {
    /// Every value sent for `key`.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Default)]
struct Routes {
    queued: HashMap<String, VecDeque<(u16, Value)>>,
    fixed: HashMap<String, (u16, Value)>,
    seen: Vec<Recorded>,
}

type Shared = Arc<Mutex<Routes>>;

/// Backend double listening on an ephemeral port.
pub struct Backend {
    addr: SocketAddr,
    routes: Shared,
    task: JoinHandle<()>,
}

impl Backend {
    /// Binds to `127.0.0.1:0` and starts serving.
    pub async fn start() -> Self {
        let routes = Shared::default();
        let app = Router::new().fallback(handle).with_state(routes.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, routes, task }
    }

    /// Base URL of the backend.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answers every request to `path` with `status` and `body`.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.routes.lock().unwrap().fixed.insert(path.to_string(), (status, body));
    }

    /// Answers the next request to `path` with `status` and `body`, ahead of
    /// the fixed answer.
    pub fn respond_once(&self, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back((status, body));
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.routes.lock().unwrap().seen.clone()
    }

    /// Requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    /// Client settings pointing at this backend.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.url()).with_access_token(TOKEN)
    }

    /// A client over real HTTP to this backend.
    pub fn client(&self) -> SentiviewClient {
        SentiviewClient::new(self.config()).expect("client builds")
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(routes): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let query = reqwest::Url::parse(&format!("http://backend{uri}"))
        .map(|url| url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect())
        .unwrap_or_default();
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let body = serde_json::from_slice(&body).ok();

    let mut routes = routes.lock().unwrap();
    let path = uri.path().to_string();
    routes.seen.push(Recorded {
        method,
        path: path.clone(),
        query,
        bearer,
        body,
    });

    let answer = routes
        .queued
        .get_mut(&path)
        .and_then(VecDeque::pop_front)
        .or_else(|| routes.fixed.get(&path).cloned());
    let (status, body) = answer.unwrap_or((404, json!({ "detail": "Not Found" })));
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}
