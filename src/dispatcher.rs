//! Handler dispatch over coroutine channels.
//!
//! Each registered handler owns a dedicated coroutine fed by an mpsc channel.
//! Dispatching a request means cloning the parsed data into a
//! [`HandlerRequest`], sending it to the handler's channel and blocking on the
//! reply channel. A panicking handler is caught inside its coroutine and
//! answered with a 500 so the server loop never sees the unwind.

use crate::app::App;
use crate::config::parse_stack_size;
use crate::ids::RequestId;
use crate::server::ParsedRequest;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Request data passed to a handler coroutine.
///
/// Carries everything extracted from the HTTP request plus a reply channel
/// and a weak reference back to the running application, so handlers can
/// consult configuration or the inlined stylesheets without keeping the app
/// alive on their own.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for correlation across log lines
    pub request_id: RequestId,
    /// The application this request is being served by
    pub app: Weak<App>,
    /// HTTP method
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// Name of the handler chosen for this request
    pub handler_name: String,
    /// HTTP headers, lowercase names
    pub headers: HashMap<String, String>,
    /// Cookies parsed from the Cookie header
    pub cookies: HashMap<String, String>,
    /// Query string parameters
    pub query_params: HashMap<String, String>,
    /// Request body parsed as JSON, if present
    pub body: Option<Value>,
    /// Channel for sending the response back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// The running application, if it is still alive.
    pub fn app(&self) -> Option<Arc<App>> {
        self.app.upgrade()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// Response sent back from a handler coroutine.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code
    pub status: u16,
    /// Extra response headers
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with no extra headers.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }
}

/// Sending side of a handler's request channel.
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Registry of handler channels, keyed by handler name.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, HandlerSender>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler function under a name, spawning its coroutine.
    ///
    /// The coroutine stack size honors `GANTRY_STACK_SIZE` (decimal or `0x`
    /// hex) and defaults to 64 KB. Re-registering a name replaces the old
    /// handler; its channel closes and the old coroutine drains out.
    ///
    /// # Safety
    ///
    /// `may::coroutine::Builder::spawn` is unsafe by runtime contract: the
    /// closure must not use thread local storage across yields and must not
    /// outlive data it borrows. The closure here owns everything it touches
    /// (`Fn(HandlerRequest) + Send + 'static`) and replies over a channel
    /// instead of unwinding, which satisfies those requirements.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let coroutine_name = name.clone();

        let stack_size =
            parse_stack_size(std::env::var("GANTRY_STACK_SIZE").ok().as_deref());

        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(
                        handler_name = %coroutine_name,
                        stack_size,
                        "handler coroutine started"
                    );
                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let handler_name = req.handler_name.clone();
                        let request_id = req.request_id;
                        let started = Instant::now();

                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            let panic_message = format!("{panic:?}");
                            error!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                panic_message = %panic_message,
                                "handler panicked"
                            );
                            let response = HandlerResponse::error(
                                500,
                                &format!("Handler panicked: {panic_message}"),
                            );
                            if reply_tx.send(response).is_err() {
                                error!(
                                    request_id = %request_id,
                                    handler_name = %handler_name,
                                    "reply channel closed before panic response could be sent"
                                );
                            }
                        } else {
                            debug!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                execution_time_ms = started.elapsed().as_millis() as u64,
                                "handler execution complete"
                            );
                        }
                    }
                })
        };

        match spawn_result {
            Ok(_) => self.add_handler(&name, tx),
            Err(e) => error!(handler_name = %name, error = %e, "failed to spawn handler coroutine"),
        }
    }

    /// Insert a handler channel, replacing and closing any previous one.
    pub fn add_handler(&mut self, name: &str, sender: HandlerSender) {
        if let Some(old_sender) = self.handlers.remove(name) {
            // Drop the old sender explicitly so the old coroutine's loop ends.
            drop(old_sender);
            warn!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "replaced existing handler, old coroutine will exit"
            );
        }
        info!(
            handler_name = %name,
            total_handlers = self.handlers.len() + 1,
            "handler registered"
        );
        self.handlers.insert(name.to_string(), sender);
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered handler names, sorted for stable output.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Send a request to the named handler and wait for its reply.
    ///
    /// Returns `None` when the handler is unknown, its channel is closed, or
    /// the reply channel was dropped without an answer; the caller maps all
    /// of those to an HTTP error.
    pub fn dispatch(
        &self,
        handler_name: &str,
        req: &ParsedRequest,
        app: Weak<App>,
    ) -> Option<HandlerResponse> {
        let tx = match self.handlers.get(handler_name) {
            Some(tx) => tx,
            None => {
                error!(
                    handler_name = %handler_name,
                    available_handlers = ?self.handler_names(),
                    "handler not found"
                );
                return None;
            }
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id: req.request_id,
            app,
            method: req.method.parse().unwrap_or(Method::GET),
            path: req.path.clone(),
            handler_name: handler_name.to_string(),
            headers: req.headers.clone(),
            cookies: req.cookies.clone(),
            query_params: req.query_params.clone(),
            body: req.body.clone(),
            reply_tx,
        };

        debug!(
            request_id = %req.request_id,
            handler_name = %handler_name,
            "dispatching request to handler"
        );
        if tx.send(request).is_err() {
            error!(
                request_id = %req.request_id,
                handler_name = %handler_name,
                "handler channel closed"
            );
            return None;
        }
        reply_rx.recv().ok()
    }
}
