//! The network seam: anything that can turn an `HttpRequest` into an
//! `HttpResponse`.
//!
//! `UreqTransport` is the stock implementation. It reads every response body
//! in full before returning, so the connection goes back to the pool on every
//! path, including responses the caller never decodes.

use std::sync::{Arc, OnceLock};

use tracing::debug;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::RequestBuilder;

use crate::config::TransportConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Opaque failure reported by a transport.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Performs one blocking HTTP round-trip.
///
/// Statuses >= 400 are responses, not errors: only failures to obtain a
/// response at all (connection refused, DNS, TLS, timeout) return `Err`.
/// Implementations are shared between threads.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Process-wide transport used when a `Requester` is created without one.
///
/// Built once from `TransportConfig::from_env()`.
pub fn default_transport() -> Arc<dyn Transport> {
    static DEFAULT: OnceLock<Arc<UreqTransport>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(UreqTransport::new(&TransportConfig::from_env())))
        .clone()
}

/// Blocking transport backed by a pooled `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_body_size: u64,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host)
            .build()
            .new_agent();
        Self {
            agent,
            max_body_size: config.max_body_size,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => without_body(self.agent.get(url), &request),
            HttpMethod::Delete => without_body(self.agent.delete(url), &request),
            HttpMethod::Head => without_body(self.agent.head(url), &request),
            HttpMethod::Options => without_body(self.agent.options(url), &request),
            HttpMethod::Post => with_body(self.agent.post(url), &request),
            HttpMethod::Put => with_body(self.agent.put(url), &request),
            HttpMethod::Patch => with_body(self.agent.patch(url), &request),
        };

        let mut response = result.map_err(|e| {
            debug!(method = %request.method, url, error = %e, "transport failure");
            Box::new(e) as TransportError
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_vec()
            .map_err(|e| {
                debug!(method = %request.method, url, status, error = %e, "body read failure");
                Box::new(e) as TransportError
            })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn apply_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn without_body(
    builder: RequestBuilder<WithoutBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = apply_headers(builder, request);
    match &request.body {
        Some(body) => builder.force_send_body().send(body.as_slice()),
        None => builder.call(),
    }
}

fn with_body(
    builder: RequestBuilder<WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = apply_headers(builder, request);
    match &request.body {
        Some(body) => builder.send(body.as_slice()),
        None => builder.send_empty(),
    }
}
