#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, unsafe_code)]

mod common;

use common::app_root::TempAppRoot;
use common::http::{get, parse_parts};
use common::test_server::setup_may_runtime;
use gantry::app::AppCell;
use gantry::config::ExecutionMode;
use gantry::discovery::EchoRegistrar;
use gantry::middleware::{FnMiddleware, Intercept, Middleware};
use gantry::server::ParsedRequest;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the status reported to the after hook for every request.
struct StatusRecorder {
    statuses: Mutex<Vec<u16>>,
}

impl StatusRecorder {
    fn new() -> Self {
        Self {
            statuses: Mutex::new(Vec::new()),
        }
    }
}

impl Middleware for StatusRecorder {
    fn after(&self, _req: &ParsedRequest, status: u16, _latency: Duration) {
        self.statuses.lock().unwrap().push(status);
    }
}

#[test]
fn test_function_middleware_short_circuits_over_http() {
    setup_may_runtime();
    let root = TempAppRoot::new().with_handler("admin");
    let cell = AppCell::new();
    let app = cell
        .bootstrap(root.config(ExecutionMode::development()), &EchoRegistrar)
        .unwrap();
    app.wait_ready().unwrap();

    app.service()
        .use_middleware(Arc::new(FnMiddleware::new("deny-admin", |req| {
            req.path
                .starts_with("/admin")
                .then(|| Intercept::json(403, &json!({"error": "Forbidden"})))
        })))
        .unwrap();

    let addr = app.bound_addr().unwrap();

    // The intercept wins even though an "admin" handler is registered.
    let (status, content_type, body) = parse_parts(&get(&addr, "/admin/settings"));
    assert_eq!(status, 403);
    assert_eq!(content_type, "application/json");
    assert_eq!(body, "{\"error\":\"Forbidden\"}");

    // Other routes are untouched by the hook.
    let (status, _, _) = parse_parts(&get(&addr, "/health"));
    assert_eq!(status, 200);
}

#[test]
fn test_after_hooks_observe_every_outcome() {
    setup_may_runtime();
    let root = TempAppRoot::new().with_handler("index");
    let cell = AppCell::new();
    let app = cell
        .bootstrap(root.config(ExecutionMode::development()), &EchoRegistrar)
        .unwrap();
    app.wait_ready().unwrap();

    app.service()
        .use_middleware(Arc::new(FnMiddleware::new("teapot", |req| {
            (req.path == "/teapot").then(|| Intercept::html(418, "<h1>teapot</h1>"))
        })))
        .unwrap();

    let recorder = Arc::new(StatusRecorder::new());
    app.service()
        .use_middleware(Arc::clone(&recorder) as Arc<dyn Middleware>)
        .unwrap();

    let addr = app.bound_addr().unwrap();
    let (status, _, _) = parse_parts(&get(&addr, "/teapot"));
    assert_eq!(status, 418);
    let (status, _, _) = parse_parts(&get(&addr, "/missing"));
    assert_eq!(status, 404);

    // Intercepted and routed requests both reach the after hooks.
    assert_eq!(*recorder.statuses.lock().unwrap(), vec![418, 404]);
}
