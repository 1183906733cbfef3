mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub(crate) use http_server::poll_ready;
pub use request::{parse_cookies, parse_query_params, parse_request, ParsedRequest};
pub use response::{write_handler_response, write_intercept, write_json_error};
pub use service::{handler_name_for_path, health_endpoint, AppService};
