//! Named-API request builder and executor.
//!
//! # Design
//! `Requester` maps API names to `Discoverer`s and holds a shared
//! `Transport`. Registration happens during startup through `&mut self` (or
//! `RequesterBuilder`), after which the requester is only read, so it can be
//! shared across threads behind an `Arc`.
//!
//! `execute` reports two kinds of server failure differently. If the caller
//! supplied an error target and the body decodes into it, the outcome is
//! `Ok(false)`: an expected, well-formed error. Without an error target the
//! raw status and body come back as `ApiError::HttpError`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::discovery::Discoverer;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;
use crate::request::Request;
use crate::target::Target;
use crate::transport::{default_transport, Transport};

/// Identifies this library in the default User-Agent.
pub const LIBRARY_IDENTITY: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Registry of named APIs that builds and executes requests against them.
///
/// Each API name resolves to a base URL through its `Discoverer` every time a
/// request is created. Requests carry the User-Agent
/// `"<LIBRARY_IDENTITY> (for <name>)"` unless overridden.
pub struct Requester {
    name: String,
    apis: HashMap<String, Box<dyn Discoverer>>,
    transport: Arc<dyn Transport>,
}

impl Requester {
    /// Create a requester identified by `name` in its User-Agent.
    ///
    /// `None` selects the process-wide `default_transport()`.
    pub fn new(name: &str, transport: Option<Arc<dyn Transport>>) -> Self {
        Self {
            name: name.to_string(),
            apis: HashMap::new(),
            transport: transport.unwrap_or_else(default_transport),
        }
    }

    pub fn builder(name: &str) -> RequesterBuilder {
        RequesterBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `discoverer` as the source of base URLs for `api_name`.
    ///
    /// # Panics
    /// If `api_name` is already registered. Registration is a startup step
    /// and a duplicate name is a configuration bug.
    pub fn register_api(&mut self, api_name: &str, discoverer: impl Discoverer + 'static) {
        if self.apis.contains_key(api_name) {
            panic!("api [{api_name}] already initialized");
        }
        debug!(requester = %self.name, api = api_name, "registered api");
        self.apis.insert(api_name.to_string(), Box::new(discoverer));
    }

    pub fn has_api(&self, api_name: &str) -> bool {
        self.apis.contains_key(api_name)
    }

    /// Build a request for `path` on the current base URL of `api_name`.
    pub fn new_request(&self, api_name: &str, method: HttpMethod, path: &str) -> Result<Request> {
        let discoverer = self
            .apis
            .get(api_name)
            .ok_or_else(|| ApiError::NotRegistered(api_name.to_string()))?;

        let joined = join_url(&discoverer.url(), path);
        let url = Url::parse(&joined).map_err(|source| ApiError::MalformedUrl {
            url: joined.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: joined,
            });
        }

        debug!(api = api_name, %method, %url, "built request");
        Ok(Request::new(method, url, self.default_user_agent()))
    }

    /// Send `request` and decode the response into `success` or `error`.
    ///
    /// Returns `Ok(true)` for a status below 400 and `Ok(false)` for a status
    /// of 400 or above whose body decoded into `error`. Pass `()` for a
    /// target you do not need.
    ///
    /// A decoding failure on a successful status returns `ApiError::Decode`
    /// whose `ok()` is `true`.
    pub fn execute<S, E>(&self, request: Request, mut success: S, mut error: E) -> Result<bool>
    where
        S: Target,
        E: Target,
    {
        let method = request.method();
        let url = request.url().to_string();
        let response = self
            .transport
            .send(request.into_http())
            .map_err(ApiError::Transport)?;
        let status = response.status;
        debug!(%method, %url, status, "received response");

        if response.is_error() {
            if error.is_present() {
                error
                    .decode(&response.body)
                    .map_err(|source| ApiError::Decode { status, source })?;
                return Ok(false);
            }
            debug!(%method, %url, status, "unhandled error response");
            return Err(ApiError::HttpError {
                status,
                body: response.body_text(),
            });
        }

        success
            .decode(&response.body)
            .map_err(|source| ApiError::Decode { status, source })?;
        Ok(true)
    }

    fn default_user_agent(&self) -> String {
        format!("{LIBRARY_IDENTITY} (for {})", self.name)
    }
}

/// Collects API registrations and produces a `Requester` once.
pub struct RequesterBuilder {
    name: String,
    transport: Option<Arc<dyn Transport>>,
    apis: Vec<(String, Box<dyn Discoverer>)>,
}

impl RequesterBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transport: None,
            apis: Vec::new(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn api(mut self, api_name: &str, discoverer: impl Discoverer + 'static) -> Self {
        self.apis.push((api_name.to_string(), Box::new(discoverer)));
        self
    }

    /// # Panics
    /// If the same API name was added more than once.
    pub fn build(self) -> Requester {
        let mut requester = Requester::new(&self.name, self.transport);
        for (api_name, discoverer) in self.apis {
            requester.register_api(&api_name, discoverer);
        }
        requester
    }
}

/// Join `base` and `path` with exactly one `/`, dropping at most one trailing
/// slash from `base` and one leading slash from `path`.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DirectDiscoverer;
    use crate::mock::MockTransport;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BASE_URL: &str = "http://127.0.0.1";

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Data {
        test: String,
    }

    fn requester(transport: Arc<MockTransport>) -> Requester {
        Requester::builder("test")
            .transport(transport)
            .api("test", DirectDiscoverer::new(BASE_URL))
            .build()
    }

    fn mock(transport: MockTransport) -> (Arc<MockTransport>, Requester) {
        let transport = Arc::new(transport);
        let r = requester(transport.clone());
        (transport, r)
    }

    #[test]
    fn new_requester_is_empty() {
        let r = Requester::new("test", None);
        assert_eq!(r.name(), "test");
        assert!(r.apis.is_empty());
    }

    #[test]
    fn register_api_stores_discoverers() {
        let mut r = Requester::new("test", Some(Arc::new(MockTransport::new())));
        r.register_api("test1", DirectDiscoverer::new("test1"));
        r.register_api("test2", DirectDiscoverer::new("test2"));
        for (name, discoverer) in &r.apis {
            assert_eq!(*name, discoverer.url());
        }
        assert!(r.has_api("test1"));
        assert!(!r.has_api("test3"));
    }

    #[test]
    #[should_panic(expected = "api [test2] already initialized")]
    fn register_api_twice_panics() {
        let mut r = Requester::new("test", Some(Arc::new(MockTransport::new())));
        r.register_api("test2", DirectDiscoverer::new("test2"));
        r.register_api("test2", DirectDiscoverer::new("test2"));
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn builder_rejects_duplicate_names() {
        Requester::builder("test")
            .transport(Arc::new(MockTransport::new()))
            .api("a", "http://a")
            .api("a", "http://b")
            .build();
    }

    #[test]
    fn new_request_unknown_api() {
        let (_, r) = mock(MockTransport::new());
        let err = r.new_request("notanapi", HttpMethod::Get, "").unwrap_err();
        assert!(matches!(err, ApiError::NotRegistered(ref name) if name == "notanapi"));
        assert_eq!(err.to_string(), "api [notanapi] not initialized");
    }

    #[test]
    fn new_request_joins_paths() {
        let (_, r) = mock(MockTransport::new());
        for (path, expected) in [
            ("", "http://127.0.0.1/"),
            ("/foo/bar", "http://127.0.0.1/foo/bar"),
            ("foo/bar", "http://127.0.0.1/foo/bar"),
        ] {
            let req = r.new_request("test", HttpMethod::Get, path).unwrap();
            assert_eq!(req.url().as_str(), expected, "path {path:?}");
            assert!(req.body().is_none());
        }
    }

    #[test]
    fn new_request_keeps_method() {
        let (_, r) = mock(MockTransport::new());
        let req = r.new_request("test", HttpMethod::Post, "foo/bar").unwrap();
        assert_eq!(req.method(), HttpMethod::Post);
    }

    #[test]
    fn new_request_sets_default_user_agent() {
        let (_, r) = mock(MockTransport::new());
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        assert_eq!(
            req.user_agent().unwrap(),
            format!("{LIBRARY_IDENTITY} (for test)")
        );
    }

    #[test]
    fn new_request_rejects_relative_base() {
        let mut r = Requester::new("test", Some(Arc::new(MockTransport::new())));
        r.register_api("bare", "test.com");
        let err = r.new_request("bare", HttpMethod::Get, "x").unwrap_err();
        assert!(matches!(err, ApiError::MalformedUrl { ref url, .. } if url == "test.com/x"));
    }

    #[test]
    fn new_request_rejects_other_schemes() {
        let mut r = Requester::new("test", Some(Arc::new(MockTransport::new())));
        r.register_api("ftp", "ftp://files.example.com");
        let err = r.new_request("ftp", HttpMethod::Get, "x").unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedScheme { ref scheme, .. } if scheme == "ftp"));
    }

    struct Rotating {
        hosts: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl Discoverer for Rotating {
        fn url(&self) -> String {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.hosts[i % self.hosts.len()].to_string()
        }
    }

    #[test]
    fn new_request_resolves_on_every_call() {
        let mut r = Requester::new("test", Some(Arc::new(MockTransport::new())));
        r.register_api(
            "pool",
            Rotating {
                hosts: vec!["http://a/", "http://b"],
                next: AtomicUsize::new(0),
            },
        );
        let first = r.new_request("pool", HttpMethod::Get, "/x").unwrap();
        let second = r.new_request("pool", HttpMethod::Get, "/x").unwrap();
        assert_eq!(first.url().as_str(), "http://a/x");
        assert_eq!(second.url().as_str(), "http://b/x");
    }

    #[test]
    fn execute_without_targets() {
        let (transport, r) = mock(MockTransport::new().respond(200, ""));
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        assert!(r.execute(req, (), ()).unwrap());
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn execute_decodes_success() {
        let (_, r) = mock(MockTransport::new().respond(200, r#"{"test":"test"}"#));
        let mut data = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        assert!(r.execute(req, &mut data, ()).unwrap());
        assert_eq!(data.test, "test");
    }

    #[test]
    fn execute_success_ignores_error_target() {
        let (_, r) = mock(MockTransport::new().respond(201, r#"{"test":"test"}"#));
        let mut err = Data::default();
        let req = r.new_request("test", HttpMethod::Post, "/").unwrap();
        assert!(r.execute(req, (), &mut err).unwrap());
        assert_eq!(err, Data::default());
    }

    #[test]
    fn execute_success_without_target_skips_bad_body() {
        let (_, r) = mock(MockTransport::new().respond(200, "not json"));
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        assert!(r.execute(req, (), ()).unwrap());
    }

    #[test]
    fn execute_success_decode_failure_is_ok() {
        let (_, r) = mock(MockTransport::new().respond(200, "not json"));
        let mut data = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        let err = r.execute(req, &mut data, ()).unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 200, .. }));
        assert!(err.ok());
    }

    #[test]
    fn execute_decodes_handled_error() {
        let (_, r) = mock(MockTransport::new().respond(500, r#"{"test":"test"}"#));
        let mut data = Data::default();
        let mut err = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        assert!(!r.execute(req, &mut data, &mut err).unwrap());
        assert_eq!(err.test, "test");
        assert_eq!(data, Data::default());
    }

    #[test]
    fn execute_error_decode_failure() {
        let (_, r) = mock(MockTransport::new().respond(404, "<html>missing</html>"));
        let mut err = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        let e = r.execute(req, (), &mut err).unwrap_err();
        assert!(matches!(e, ApiError::Decode { status: 404, .. }));
        assert!(!e.ok());
    }

    #[test]
    fn execute_unhandled_error_carries_raw_body() {
        let (_, r) = mock(MockTransport::new().respond(500, r#"{"test":"test"}"#));
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        let err = r.execute(req, (), ()).unwrap_err();
        assert!(!err.ok());
        match &err {
            ApiError::HttpError { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, r#"{"test":"test"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn execute_option_targets() {
        let (_, r) = mock(MockTransport::new().respond(400, r#"{"test":"bad"}"#));
        let mut err = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        let ok = r.execute(req, None::<&mut Data>, Some(&mut err)).unwrap();
        assert!(!ok);
        assert_eq!(err.test, "bad");
    }

    #[test]
    fn execute_transport_failure() {
        let (_, r) = mock(MockTransport::new().fail("connection refused"));
        let mut data = Data::default();
        let mut err = Data::default();
        let req = r.new_request("test", HttpMethod::Get, "/").unwrap();
        let e = r.execute(req, &mut data, &mut err).unwrap_err();
        assert!(matches!(e, ApiError::Transport(_)));
        assert!(!e.ok());
        assert!(e.to_string().contains("connection refused"));
        assert_eq!(data, Data::default());
        assert_eq!(err, Data::default());
    }

    #[test]
    fn execute_sends_built_request() {
        let (transport, r) = mock(MockTransport::new().respond(204, ""));
        let mut req = r.new_request("test", HttpMethod::Put, "/items/1").unwrap();
        req.set_body(&Data {
            test: "body".to_string(),
        })
        .unwrap();
        req.set_user_agent("custom");
        assert!(r.execute(req, (), ()).unwrap());

        let sent = transport.requests();
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].url.as_str(), "http://127.0.0.1/items/1");
        assert_eq!(sent[0].header("user-agent"), Some("custom"));
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
        assert_eq!(sent[0].body.as_deref(), Some(br#"{"test":"body"}"#.as_slice()));
    }

    #[test]
    fn join_url_uses_one_slash() {
        assert_eq!(join_url("http://h/", "/a/b"), "http://h/a/b");
        assert_eq!(join_url("http://h", "a/b"), "http://h/a/b");
        assert_eq!(join_url("http://h/", "a/b"), "http://h/a/b");
        assert_eq!(join_url("http://h", "/a/b"), "http://h/a/b");
    }

    #[test]
    fn join_url_strips_only_one_slash() {
        assert_eq!(join_url("http://h//", "//a"), "http://h///a");
    }
}
