// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Inbound request representation consumed by the validation pipeline.

use hyper::HeaderMap;

/// Capability surface the pipeline needs from an inbound request.
/// Integrations adapt their framework's request type to this trait.
pub trait InboundRequest {
    fn method(&self) -> &str;
    /// Path component only, query string included or not; matching strips it.
    fn path(&self) -> &str;
    /// Full request target as received.
    fn uri(&self) -> &str;
    fn headers(&self) -> &HeaderMap;
    fn body(&self) -> &str;
}

/// Immutable copy of an inbound request, taken before any downstream
/// processing can mutate the original. Validation only ever sees snapshots.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RequestSnapshot {
    pub fn of(request: &(impl InboundRequest + ?Sized)) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.path().to_string(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: request.body().to_string(),
        }
    }

    /// Minimal snapshot for construction sites and tests.
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            uri: path.to_string(),
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }
}

impl InboundRequest for RequestSnapshot {
    fn method(&self) -> &str {
        &self.method
    }
    fn path(&self) -> &str {
        &self.path
    }
    fn uri(&self) -> &str {
        &self.uri
    }
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    fn body(&self) -> &str {
        &self.body
    }
}
