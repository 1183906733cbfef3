use std::time::Duration;

use tracing::info;

use super::core::Middleware;
use crate::server::ParsedRequest;

/// Access-log middleware installed by the bootstrap sequence.
///
/// Emits one structured line per request once the status is known, keyed by
/// the request id so handler and middleware logs correlate.
pub struct RequestLogMiddleware;

impl Middleware for RequestLogMiddleware {
    fn after(&self, req: &ParsedRequest, status: u16, latency: Duration) {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status,
            latency_ms = latency.as_millis() as u64,
            "request completed"
        );
    }
}
