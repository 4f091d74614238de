//! Base URL discovery for named APIs.
//!
//! A `Discoverer` yields the current base URL of one API. The `Requester`
//! calls it on every `new_request` and never caches the result, so dynamic
//! implementations (registry lookups, rotating pools) can return a different
//! URL each time. Implementations that keep mutable state are responsible for
//! their own synchronization.

use std::sync::Arc;

/// Resolves the base URL of a single API.
pub trait Discoverer: Send + Sync {
    fn url(&self) -> String;
}

/// A fixed base URL with no pooling or discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectDiscoverer {
    base_url: String,
}

impl DirectDiscoverer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Discoverer for DirectDiscoverer {
    fn url(&self) -> String {
        self.base_url.clone()
    }
}

impl Discoverer for String {
    fn url(&self) -> String {
        self.clone()
    }
}

impl Discoverer for &'static str {
    fn url(&self) -> String {
        (*self).to_string()
    }
}

impl<D: Discoverer + ?Sized> Discoverer for Arc<D> {
    fn url(&self) -> String {
        (**self).url()
    }
}

impl<D: Discoverer + ?Sized> Discoverer for Box<D> {
    fn url(&self) -> String {
        (**self).url()
    }
}
