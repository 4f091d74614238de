//! Requests against named HTTP APIs whose base URLs are discovered at call
//! time.
//!
//! # Overview
//! A `Requester` maps API names to `Discoverer`s. `new_request` resolves the
//! current base URL, joins it with a path and returns a `Request` that the
//! caller can adjust (query, JSON body, User-Agent). `execute` sends it
//! through a `Transport` and decodes the JSON response into a success or an
//! error target depending on the status code.
//!
//! # Design
//! - The network round-trip sits behind the `Transport` trait. `UreqTransport`
//!   is the default; `MockTransport` (feature `mock`) scripts responses.
//! - Requests and responses cross the transport boundary as plain data
//!   (`HttpRequest`, `HttpResponse`) with fully buffered bodies.
//! - Decode targets are chosen by type: `()` for none, `&mut T` or
//!   `Option<&mut T>` otherwise.

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod request;
pub mod target;
pub mod transport;

pub use client::{join_url, Requester, RequesterBuilder, LIBRARY_IDENTITY};
pub use config::TransportConfig;
pub use discovery::{DirectDiscoverer, Discoverer};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use request::{QueryParams, Request};
pub use target::Target;
pub use transport::{default_transport, Transport, TransportError, UreqTransport};
