use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::core::{Intercept, Middleware};
use crate::server::ParsedRequest;

/// Errors from middleware wiring.
#[derive(Debug)]
pub enum MiddlewareError {
    /// A middleware was spliced in before the stack was installed on the
    /// service. Installation is a dedicated bootstrap step; everything that
    /// wants to add hooks runs after it.
    NotInstalled,
}

impl fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareError::NotInstalled => {
                write!(f, "middleware stack is not installed on the service yet")
            }
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Ordered collection of middleware, run in registration order.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    entries: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mw: Arc<dyn Middleware>) {
        self.entries.push(mw);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `before` hooks in order; the first intercept wins and later hooks
    /// do not run.
    pub fn run_before(&self, req: &ParsedRequest) -> Option<Intercept> {
        for (idx, mw) in self.entries.iter().enumerate() {
            if let Some(intercept) = mw.before(req) {
                debug!(
                    request_id = %req.request_id,
                    middleware = idx,
                    status = intercept.status,
                    "request intercepted by middleware"
                );
                return Some(intercept);
            }
        }
        None
    }

    /// Run `after` hooks in order with the final status.
    pub fn run_after(&self, req: &ParsedRequest, status: u16, latency: Duration) {
        for mw in &self.entries {
            mw.after(req, status, latency);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(path: &str) -> ParsedRequest {
        ParsedRequest {
            request_id: RequestId::new(),
            method: "GET".to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_params: HashMap::new(),
            body: None,
        }
    }

    struct Counter(AtomicUsize);

    impl Middleware for Counter {
        fn after(&self, _req: &ParsedRequest, _status: u16, _latency: Duration) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn before(&self, _req: &ParsedRequest) -> Option<Intercept> {
            Some(Intercept::new(403, "text/plain", b"denied".to_vec()))
        }
    }

    #[test]
    fn test_first_intercept_wins() {
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(Deny));
        stack.push(Arc::new(Deny));
        let intercept = stack.run_before(&request("/x")).unwrap();
        assert_eq!(intercept.status, 403);
    }

    #[test]
    fn test_empty_stack_passes_through() {
        let stack = MiddlewareStack::new();
        assert!(stack.run_before(&request("/x")).is_none());
    }

    #[test]
    fn test_after_runs_for_all() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::clone(&counter) as Arc<dyn Middleware>);
        stack.run_after(&request("/x"), 200, Duration::from_millis(1));
        stack.run_after(&request("/y"), 404, Duration::from_millis(1));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
