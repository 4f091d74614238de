//! Mutable, single-use request handle.
//!
//! A `Request` is produced by `Requester::new_request` with its method, URL
//! and default User-Agent already set. The caller may then adjust the query
//! string, JSON body and User-Agent before handing it to
//! `Requester::execute`, which consumes it.

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest};

pub const CONTENT_TYPE: &str = "content-type";
pub const USER_AGENT: &str = "user-agent";

/// Query parameters: name to one or more values, serialized in key order.
pub type QueryParams = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub struct Request {
    inner: HttpRequest,
}

impl Request {
    pub(crate) fn new(method: HttpMethod, url: Url, user_agent: String) -> Self {
        let mut inner = HttpRequest {
            method,
            url,
            headers: Vec::new(),
            body: None,
        };
        inner.set_header(USER_AGENT, &user_agent);
        Self { inner }
    }

    /// Replace the whole query string with `params`.
    ///
    /// A map with no values, including keys mapped to empty lists, removes
    /// the query string.
    pub fn set_query_params(&mut self, params: &QueryParams) {
        self.inner.url.set_query(None);
        if params.values().all(Vec::is_empty) {
            return;
        }
        let mut pairs = self.inner.url.query_pairs_mut();
        for (key, values) in params {
            for value in values {
                pairs.append_pair(key, value);
            }
        }
    }

    /// The decoded query string, grouped by key.
    pub fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        for (key, value) in self.inner.url.query_pairs() {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        params
    }

    /// Serialize `body` as JSON and use it as the request body.
    ///
    /// Values that serialize to `null` (`None`, `()`) are rejected; a request
    /// without a body is expressed by never calling this. On success the
    /// `content-type` header is set to `application/json`.
    pub fn set_body<T: Serialize + ?Sized>(&mut self, body: &T) -> Result<()> {
        let bytes = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        if bytes == b"null" {
            return Err(ApiError::InvalidBody);
        }
        self.inner.set_header(CONTENT_TYPE, "application/json");
        self.inner.body = Some(bytes);
        Ok(())
    }

    /// Override the User-Agent header. An empty value is kept as-is.
    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.inner.set_header(USER_AGENT, user_agent);
    }

    pub fn method(&self) -> HttpMethod {
        self.inner.method
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.inner.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.inner.body.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(USER_AGENT)
    }

    pub fn into_http(self) -> HttpRequest {
        self.inner
    }
}
