//! # Application Composition Root
//!
//! [`App`] assembles the server process from its subsystems in a fixed
//! order, then listens. Each step is named by a [`Stage`] and the sequence
//! stops at the first failure:
//!
//! 1. `aliases` - register module path aliases
//! 2. `middleware` - install the middleware stack on the service
//! 3. `dev-bridge` - attach the development asset bridge (skipped in
//!    production)
//! 4. `context` - bind the app back-reference onto the service
//! 5. `handlers` - discover and register route handlers
//! 6. `static-assets` - register static mounts
//! 7. `listen` - bind and serve (skipped in test mode)
//!
//! Later steps rely on earlier ones: handler discovery refuses to run before
//! alias registration, and the dev bridge can only be spliced in once the
//! middleware stack is installed.
//!
//! [`AppCell`] provides the one-per-process construction: the first
//! `bootstrap` through a cell builds the app, every later call returns the
//! same instance without repeating any step.

mod error;

pub use error::{BootstrapError, Stage};

use crate::alias::{self, AliasMap};
use crate::config::AppConfig;
use crate::dev_bridge::DevAssetBridge;
use crate::discovery::{self, HandlerRegistrar};
use crate::dispatcher::Dispatcher;
use crate::middleware::{Middleware, MiddlewareStack, RequestLogMiddleware};
use crate::paths::AppPaths;
use crate::server::{AppService, HttpServer, ServerHandle, poll_ready};
use crate::static_assets::StaticMount;
use crate::stylesheets::inline_style_sheets;
use notify::RecommendedWatcher;
use once_cell::sync::OnceCell;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// The assembled application.
///
/// Owns the HTTP service state, the optional dev bridge, and the server
/// handle once listening. The service holds only a weak reference back, so
/// dropping the last `Arc<App>` tears everything down.
pub struct App {
    config: AppConfig,
    paths: AppPaths,
    service: AppService,
    dev_bridge: RwLock<Option<Arc<DevAssetBridge>>>,
    server: Mutex<Option<ServerHandle>>,
    bound: RwLock<Option<SocketAddr>>,
    running: AtomicBool,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

fn run_stage<F>(stage: Stage, f: F) -> Result<(), BootstrapError>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    debug!(stage = %stage, "bootstrap stage starting");
    f().map_err(|source| BootstrapError::Stage { stage, source })?;
    debug!(stage = %stage, "bootstrap stage complete");
    Ok(())
}

impl App {
    /// Assemble an application and, outside test mode, start listening.
    ///
    /// Runs the bootstrap stages strictly in order. The returned `Arc` is
    /// the only strong handle; callers that need one-per-process semantics
    /// go through [`AppCell::bootstrap`] instead of calling this twice.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the sequence with
    /// [`BootstrapError::Stage`] naming it.
    pub fn bootstrap(
        config: AppConfig,
        registrar: &dyn HandlerRegistrar,
    ) -> Result<Arc<Self>, BootstrapError> {
        let paths = AppPaths::from_root(config.root.clone());
        let service = AppService::new(Arc::new(RwLock::new(Dispatcher::new())));
        let app = Arc::new(App {
            config,
            paths,
            service,
            dev_bridge: RwLock::new(None),
            server: Mutex::new(None),
            bound: RwLock::new(None),
            running: AtomicBool::new(false),
            watcher: Mutex::new(None),
        });

        run_stage(Stage::Aliases, || {
            alias::register(&app.paths);
            Ok(())
        })?;

        run_stage(Stage::Middleware, || {
            let mut stack = MiddlewareStack::new();
            stack.push(Arc::new(RequestLogMiddleware));
            app.service.install_middleware(stack);
            Ok(())
        })?;

        run_stage(Stage::DevBridge, || {
            if app.config.mode.is_production() {
                debug!("production mode, dev bridge not attached");
                return Ok(());
            }
            app.attach_dev_bridge()?;
            Ok(())
        })?;

        run_stage(Stage::Context, || {
            app.service.set_app(Arc::downgrade(&app));
            Ok(())
        })?;

        run_stage(Stage::Handlers, || {
            let count = {
                let mut dispatcher = app.service.dispatcher.write().unwrap();
                discovery::load_handlers(&app.paths.handlers, &mut dispatcher, registrar)?
            };
            debug!(count, "route handlers registered");
            Ok(())
        })?;

        run_stage(Stage::StaticAssets, || {
            app.mount_static_assets();
            Ok(())
        })?;

        if app.config.mode.is_test() {
            debug!("test mode, skipping listen");
        } else {
            app.listen()?;
        }

        info!(
            mode = app.config.mode.label(),
            root = %app.paths.root.display(),
            listening = app.is_running(),
            "bootstrap complete"
        );
        Ok(app)
    }

    /// Build the dev bridge over this app's alias mapping and splice it into
    /// the middleware stack. Quiet in test mode.
    fn attach_dev_bridge(&self) -> anyhow::Result<()> {
        let aliases = AliasMap::new(&self.paths);
        let bridge = Arc::new(DevAssetBridge::new(
            self.paths.clone(),
            aliases,
            self.config.mode.is_test(),
        ));
        self.service
            .use_middleware(Arc::clone(&bridge) as Arc<dyn Middleware>)?;
        *self.dev_bridge.write().unwrap() = Some(bridge);
        debug!("dev asset bridge attached");
        Ok(())
    }

    /// Register the static mounts the mode calls for: the public assets
    /// directory whenever it exists, and in production the built client
    /// bundle at the root with auto-index disabled so the rendered index
    /// stays with its handler.
    fn mount_static_assets(&self) {
        if self.paths.assets.is_dir() {
            self.service
                .add_mount(StaticMount::new("/assets/", &self.paths.assets));
        } else {
            debug!(dir = %self.paths.assets.display(), "assets directory absent, mount skipped");
        }
        if self.config.mode.is_production() {
            self.service.add_mount(
                StaticMount::new("/", &self.paths.dist_client).without_auto_index(),
            );
        }
    }

    /// Bind the configured address and start serving.
    ///
    /// The running flag is one-way: once a server is bound, further `listen`
    /// calls fail with [`BootstrapError::AlreadyRunning`] for the life of
    /// the process, even after [`join`](Self::join) returns.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::AlreadyRunning`] when already bound, or
    /// [`BootstrapError::Stage`] for bind failures.
    pub fn listen(&self) -> Result<(), BootstrapError> {
        let mut server = self.server.lock().unwrap();
        if self.running.load(Ordering::SeqCst) {
            let port = self.bound_port().unwrap_or(self.config.port);
            return Err(BootstrapError::AlreadyRunning { port });
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let handle = HttpServer(self.service.clone())
            .start(addr.as_str())
            .map_err(|e| BootstrapError::stage(Stage::Listen, e))?;

        let port = handle.port();
        *self.bound.write().unwrap() = Some(handle.addr());
        self.running.store(true, Ordering::SeqCst);
        *server = Some(handle);

        println!("App is listening on port: {port}");
        info!(host = %self.config.host, port, "server listening");
        Ok(())
    }

    /// Block until the server coroutine exits. The running flag stays set.
    ///
    /// # Errors
    ///
    /// Returns an error if the server coroutine panicked.
    pub fn join(&self) -> std::thread::Result<()> {
        let handle = self.server.lock().unwrap().take();
        match handle {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    /// Wait until the bound server accepts connections.
    ///
    /// # Errors
    ///
    /// `NotConnected` when the app is not listening, `TimedOut` when the
    /// server does not come up.
    pub fn wait_ready(&self) -> io::Result<()> {
        // The server slot lock is held only to snapshot the address; the
        // poll runs without it.
        let addr = self.server.lock().unwrap().as_ref().map(ServerHandle::addr);
        match addr {
            Some(addr) => poll_ready(addr),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "app is not listening",
            )),
        }
    }

    /// Watch the handlers directory and re-register handlers on change.
    /// Idempotent per app: a second call replaces the previous watcher.
    ///
    /// # Errors
    ///
    /// Propagates watcher setup failures.
    pub fn watch_handlers(
        &self,
        registrar: Arc<dyn HandlerRegistrar>,
    ) -> notify::Result<()> {
        let watcher = discovery::watch_handlers(
            &self.paths.handlers,
            Arc::clone(&self.service.dispatcher),
            registrar,
        )?;
        *self.watcher.lock().unwrap() = Some(watcher);
        info!(dir = %self.paths.handlers.display(), "watching handlers for changes");
        Ok(())
    }

    /// Inline the built stylesheets, if the build output directory exists.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from reading the stylesheet files.
    pub fn style_sheets(&self) -> io::Result<Option<String>> {
        inline_style_sheets(&self.paths.dist_assets)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address actually bound, once listening.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.bound.read().unwrap()
    }

    /// Port actually bound, once listening.
    pub fn bound_port(&self) -> Option<u16> {
        self.bound_addr().map(|a| a.port())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Configured listen host.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn service(&self) -> &AppService {
        &self.service
    }

    pub fn dev_bridge_attached(&self) -> bool {
        self.dev_bridge.read().unwrap().is_some()
    }

    /// The attached dev bridge, outside production.
    pub fn dev_bridge(&self) -> Option<Arc<DevAssetBridge>> {
        self.dev_bridge.read().unwrap().clone()
    }
}

/// One-shot holder for the process-wide [`App`].
///
/// The hidden-singleton construction is deliberately avoided: the cell is an
/// explicit value the embedder owns (usually a `static`), and the one-way
/// latch is visible in its API. The first `bootstrap` wins; concurrent and
/// later calls get the same instance.
pub struct AppCell {
    cell: OnceCell<Arc<App>>,
}

impl AppCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Bootstrap on first call; return the existing app on every later call
    /// without repeating any stage.
    ///
    /// # Errors
    ///
    /// Propagates [`App::bootstrap`] errors. A failed bootstrap leaves the
    /// cell empty, so the next call retries.
    pub fn bootstrap(
        &self,
        config: AppConfig,
        registrar: &dyn HandlerRegistrar,
    ) -> Result<Arc<App>, BootstrapError> {
        self.cell
            .get_or_try_init(|| App::bootstrap(config, registrar))
            .map(Arc::clone)
    }

    /// The app, if a bootstrap already succeeded.
    pub fn get(&self) -> Option<Arc<App>> {
        self.cell.get().map(Arc::clone)
    }
}

impl Default for AppCell {
    fn default() -> Self {
        Self::new()
    }
}
