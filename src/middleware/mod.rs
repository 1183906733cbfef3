mod adapter;
mod core;
mod request_log;
mod stack;

pub use adapter::FnMiddleware;
pub use core::{Intercept, Middleware};
pub use request_log::RequestLogMiddleware;
pub use stack::{MiddlewareError, MiddlewareStack};
