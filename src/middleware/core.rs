use std::time::Duration;

use crate::server::ParsedRequest;

/// A response produced by a middleware instead of the handler pipeline.
///
/// Returning one from [`Middleware::before`] ends the request immediately;
/// no later middleware, mount or handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intercept {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Intercept {
    pub fn new(status: u16, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body,
        }
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/html", body.into().into_bytes())
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, "application/json", value.to_string().into_bytes())
    }
}

/// Hook points around request processing.
///
/// `before` runs ahead of static mounts and handler dispatch and may
/// short-circuit by returning an [`Intercept`]. `after` runs once the response
/// status is known, for every request that reached the pipeline, including
/// intercepted ones.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &ParsedRequest) -> Option<Intercept> {
        None
    }
    fn after(&self, _req: &ParsedRequest, _status: u16, _latency: Duration) {}
}
