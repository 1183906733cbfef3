//! # Gantry
//!
//! **Gantry** is a coroutine-powered composition root for web application servers in Rust,
//! built on the [`may`](https://docs.rs/may) runtime.
//!
//! ## Overview
//!
//! Gantry assembles an HTTP server process out of independently developed subsystems
//! (module path aliases, request middleware, a development-mode asset bridge,
//! convention-discovered route handlers, static asset mounts) by wiring them together in a
//! fixed, explicit order and then listening. The assembly order is the contract: handler
//! discovery relies on aliases being registered, the dev bridge relies on the middleware
//! stack being installed, and listening comes last so a bound port always means a fully
//! assembled app.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`app`]** - The composition root: bootstrap sequencing, the listen guard, and the
//!   one-per-process [`AppCell`](app::AppCell)
//! - **[`config`]** - Environment-derived configuration and the execution mode
//! - **[`paths`]** - The fixed directory layout under the application root
//! - **[`alias`]** - `@root` / `@client` / `@server` / `@shared` module path aliases
//! - **[`middleware`]** - The middleware trait, stack, and function adapter
//! - **[`dev_bridge`]** - Development-mode serving of the source tree and the rendered index
//! - **[`discovery`]** - Handler-file discovery, registration, and hot reload
//! - **[`dispatcher`]** - Coroutine-based request handler dispatch
//! - **[`server`]** - HTTP server built on `may_minihttp` with request/response plumbing
//! - **[`static_assets`]** - Traversal-guarded static file serving and URL mounts
//! - **[`stylesheets`]** - Inlining of built CSS into server-rendered pages
//!
//! ### Bootstrap Flow
//!
//! `bootstrap()` runs seven named stages strictly in order; production skips the dev
//! bridge and test mode skips listening:
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Embedder
//!     participant Cell as AppCell
//!     participant App
//!     participant Aliases as alias registry
//!     participant Service as AppService
//!     participant Bridge as DevAssetBridge
//!     participant Discovery
//!     participant Server as HttpServer
//!
//!     Embedder->>Cell: bootstrap(config, registrar)
//!     Cell->>App: App::bootstrap (first call only)
//!     App->>Aliases: register(@root, @client, @server, @shared)
//!     App->>Service: install_middleware(stack + request log)
//!
//!     alt not production
//!         App->>Bridge: build over aliases
//!         App->>Service: use_middleware(bridge)
//!     end
//!
//!     App->>Service: set_app(weak back-reference)
//!     App->>Discovery: load_handlers(src/server/handlers)
//!     Discovery->>Service: register {name}.handler.* with dispatcher
//!     App->>Service: mount /assets/ (if present)
//!
//!     alt production
//!         App->>Service: mount / over dist/client (no auto-index)
//!     end
//!
//!     alt not test mode
//!         App->>Server: start(host:port)
//!         Server-->>App: ServerHandle
//!         App-->>Embedder: "App is listening on port: {port}"
//!     end
//!
//!     Cell-->>Embedder: Arc<App> (same instance on every later call)
//! ```
//!
//! ### Request Pipeline
//!
//! Each request is parsed once, then flows through: middleware `before` hooks (first
//! intercept wins, which is where the dev bridge serves source files and the rendered
//! index), the built-in `GET /health` endpoint, the static mounts in registration order
//! (a miss falls through), and finally handler dispatch keyed by the first path segment
//! (`/` maps to the `index` handler). Every outcome reaches the `after` hooks with the
//! final status, so the access log sees intercepted and dispatched requests alike.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gantry::{app::AppCell, config::AppConfig, discovery::EchoRegistrar};
//!
//! static APP: AppCell = AppCell::new();
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env();
//!     gantry::telemetry::init(config.mode);
//!
//!     let app = APP.bootstrap(config, &EchoRegistrar)?;
//!     if app.join().is_err() {
//!         anyhow::bail!("server exited abnormally");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Everything is environment-driven and resolved once at startup:
//!
//! | variable            | meaning                                    | default     |
//! |---------------------|--------------------------------------------|-------------|
//! | `PORT`              | listen port                                | `7456`      |
//! | `HOST`              | listen host                                | `0.0.0.0`   |
//! | `GANTRY_APP_ROOT`   | application root directory                 | current dir |
//! | `GANTRY_ENV`        | `production` / `test` mode marker          | unset       |
//! | `GANTRY_TEST_BUILD` | any non-empty value switches to test mode  | unset       |
//! | `GANTRY_STACK_SIZE` | handler coroutine stack size               | `0x10000`   |
//!
//! ## Runtime Considerations
//!
//! Gantry uses the `may` coroutine runtime, not tokio or async-std. This means:
//!
//! - Each handler runs in a coroutine fed by an MPSC channel
//! - Stack size is configurable via the `GANTRY_STACK_SIZE` environment variable
//! - The runtime is incompatible with tokio-based libraries without bridging
//! - Blocking operations should use `may`'s blocking facilities

pub mod alias;
pub mod app;
pub mod config;
pub mod dev_bridge;
pub mod discovery;
pub mod dispatcher;
pub mod ids;
pub mod middleware;
pub mod paths;
pub mod server;
pub mod static_assets;
pub mod stylesheets;
pub mod telemetry;

pub use app::{App, AppCell, BootstrapError, Stage};
pub use config::{AppConfig, ExecutionMode};
pub use discovery::{DiscoveredHandler, EchoRegistrar, HandlerRegistrar};
pub use dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
