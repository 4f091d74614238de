use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// Body served by the fixed success and failure routes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestPayload {
    pub test: String,
}

/// What the `/echo` routes saw of the incoming request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(empty_ok))
        .route("/success", get(success).post(success))
        .route("/failure", get(failure))
        .route("/malformed", get(malformed))
        .route("/status/{code}", any(status))
        .route("/large/{code}/{bytes}", get(large))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn payload() -> Json<TestPayload> {
    Json(TestPayload {
        test: "test".to_string(),
    })
}

async fn empty_ok() -> StatusCode {
    StatusCode::OK
}

async fn success() -> Json<TestPayload> {
    payload()
}

async fn failure() -> (StatusCode, Json<TestPayload>) {
    (StatusCode::INTERNAL_SERVER_ERROR, payload())
}

async fn malformed() -> &'static str {
    "not json"
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<TestPayload>), StatusCode> {
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((code, payload()))
}

/// Largest body `/large` will generate.
pub const LARGE_BODY_LIMIT: usize = 64 << 20;

async fn large(
    Path((code, bytes)): Path<(u16, usize)>,
) -> Result<(StatusCode, Vec<u8>), StatusCode> {
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    if bytes > LARGE_BODY_LIMIT {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok((code, vec![b'x'; bytes]))
}

async fn echo(
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    debug!(%method, %uri, "echo");
    let headers = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
