use tracing::debug;

use super::core::{Intercept, Middleware};
use crate::server::ParsedRequest;

/// Adapter that lifts a plain function into the [`Middleware`] trait.
///
/// This is the splice point for hook logic that lives outside the crate:
/// anything expressible as `fn(&ParsedRequest) -> Option<Intercept>` can be
/// registered without writing a struct and trait impl.
pub struct FnMiddleware {
    name: &'static str,
    func: Box<dyn Fn(&ParsedRequest) -> Option<Intercept> + Send + Sync>,
}

impl FnMiddleware {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&ParsedRequest) -> Option<Intercept> + Send + Sync + 'static,
    {
        Self {
            name,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Middleware for FnMiddleware {
    fn before(&self, req: &ParsedRequest) -> Option<Intercept> {
        let intercept = (self.func)(req);
        if intercept.is_some() {
            debug!(middleware = self.name, path = %req.path, "function middleware intercepted request");
        }
        intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;
    use std::collections::HashMap;

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

    #[test]
    fn test_function_can_intercept() {
        let mw = FnMiddleware::new("maintenance", |req| {
            (req.path == "/admin").then(|| Intercept::html(503, "<h1>down</h1>"))
        });
        assert!(mw.before(&request("/")).is_none());
        let hit = mw.before(&request("/admin")).unwrap();
        assert_eq!(hit.status, 503);
        assert_eq!(mw.name(), "maintenance");
    }
}
