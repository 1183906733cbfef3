use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, write_intercept, write_json_error};
use crate::app::App;
use crate::dispatcher::Dispatcher;
use crate::middleware::{Middleware, MiddlewareError, MiddlewareStack};
use crate::static_assets::StaticMount;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::{Arc, RwLock, Weak};
use std::time::Instant;
use tracing::{error, info, warn};

/// The HTTP service cloned into every server coroutine.
///
/// Holds the shared pipeline state behind `Arc`s: the handler dispatcher,
/// the installed middleware stack, the static mounts, and a weak
/// back-reference to the owning [`App`]. Bootstrap steps mutate this state
/// through the shared handles before the server starts; clones made per
/// connection all observe the same state.
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<RwLock<Dispatcher>>,
    middleware: Arc<RwLock<Option<MiddlewareStack>>>,
    mounts: Arc<RwLock<Vec<StaticMount>>>,
    app: Arc<RwLock<Weak<App>>>,
}

impl AppService {
    pub fn new(dispatcher: Arc<RwLock<Dispatcher>>) -> Self {
        Self {
            dispatcher,
            middleware: Arc::new(RwLock::new(None)),
            mounts: Arc::new(RwLock::new(Vec::new())),
            app: Arc::new(RwLock::new(Weak::new())),
        }
    }

    /// Install the middleware stack. Splicing middleware is only possible
    /// after this ran; bootstrap does it as its own step.
    pub fn install_middleware(&self, stack: MiddlewareStack) {
        let mut slot = self.middleware.write().unwrap();
        if slot.is_some() {
            warn!("middleware stack already installed, replacing");
        }
        *slot = Some(stack);
    }

    /// Append a middleware to the installed stack.
    ///
    /// # Errors
    ///
    /// [`MiddlewareError::NotInstalled`] when called before
    /// [`install_middleware`](Self::install_middleware).
    pub fn use_middleware(&self, mw: Arc<dyn Middleware>) -> Result<(), MiddlewareError> {
        let mut slot = self.middleware.write().unwrap();
        match slot.as_mut() {
            Some(stack) => {
                stack.push(mw);
                Ok(())
            }
            None => Err(MiddlewareError::NotInstalled),
        }
    }

    pub fn middleware_installed(&self) -> bool {
        self.middleware.read().unwrap().is_some()
    }

    pub fn middleware_len(&self) -> usize {
        self.middleware
            .read()
            .unwrap()
            .as_ref()
            .map_or(0, MiddlewareStack::len)
    }

    /// Register a static mount. Mounts are consulted in registration order.
    pub fn add_mount(&self, mount: StaticMount) {
        info!(
            url_prefix = %mount.url_prefix(),
            auto_index = mount.auto_index(),
            "static mount registered"
        );
        self.mounts.write().unwrap().push(mount);
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.read().unwrap().len()
    }

    /// Bind the back-reference to the owning application. Weak by contract:
    /// the app owns the server, never the other way around.
    pub fn set_app(&self, app: Weak<App>) {
        *self.app.write().unwrap() = app;
    }

    /// The owning application, while it is alive.
    pub fn app(&self) -> Option<Arc<App>> {
        self.app.read().unwrap().upgrade()
    }

    fn respond(
        &self,
        parsed: &ParsedRequest,
        res: &mut Response,
        stack: Option<&MiddlewareStack>,
    ) -> io::Result<u16> {
        if let Some(stack) = stack {
            if let Some(intercept) = stack.run_before(parsed) {
                let status = intercept.status;
                write_intercept(res, intercept);
                return Ok(status);
            }
        }

        if parsed.method == "GET" && parsed.path == "/health" {
            health_endpoint(res)?;
            return Ok(200);
        }

        if parsed.method == "GET" {
            let mounts = self.mounts.read().unwrap();
            for mount in mounts.iter() {
                match mount.serve(&parsed.path) {
                    Ok(Some((bytes, ct))) => {
                        res.status_code(200, "OK");
                        let header = format!("Content-Type: {ct}").into_boxed_str();
                        res.header(Box::leak(header));
                        res.body_vec(bytes);
                        return Ok(200);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(
                            request_id = %parsed.request_id,
                            path = %parsed.path,
                            error = %e,
                            "static mount read failed"
                        );
                        write_json_error(
                            res,
                            500,
                            serde_json::json!({ "error": "Static file error" }),
                        );
                        return Ok(500);
                    }
                }
            }
        }

        let handler_name = handler_name_for_path(&parsed.path);
        let dispatcher = self.dispatcher.read().unwrap();
        if !dispatcher.has_handler(&handler_name) {
            write_json_error(
                res,
                404,
                serde_json::json!({
                    "error": "Not Found",
                    "method": parsed.method,
                    "path": parsed.path
                }),
            );
            return Ok(404);
        }

        let app = Weak::clone(&self.app.read().unwrap());
        match dispatcher.dispatch(&handler_name, parsed, app) {
            Some(hr) => {
                let status = hr.status;
                write_handler_response(res, hr.status, hr.body, &hr.headers);
                Ok(status)
            }
            None => {
                write_json_error(
                    res,
                    500,
                    serde_json::json!({
                        "error": "Handler failed or not registered",
                        "method": parsed.method,
                        "path": parsed.path
                    }),
                );
                Ok(500)
            }
        }
    }
}

/// Map a request path to a handler name: the first path segment, with the
/// bare root mapping to `index`.
pub fn handler_name_for_path(path: &str) -> String {
    let name = path.trim_start_matches('/').split('/').next().unwrap_or("");
    if name.is_empty() {
        "index".to_string()
    } else {
        name.to_string()
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_handler_response(
        res,
        200,
        serde_json::json!({ "status": "ok" }),
        &std::collections::HashMap::new(),
    );
    Ok(())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let started = Instant::now();
        let parsed = parse_request(req);
        let stack = self.middleware.read().unwrap().clone();
        let status = self.respond(&parsed, res, stack.as_ref())?;
        if let Some(stack) = &stack {
            stack.run_after(&parsed, status, started.elapsed());
        }
        Ok(())
    }
}
