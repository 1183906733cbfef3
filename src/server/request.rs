use crate::ids::RequestId;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

/// Parsed HTTP request data used by `AppService`.
///
/// Contains all extracted information from the raw HTTP request including
/// headers, cookies, query parameters, and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    /// Request ID, taken from the `x-request-id` header or generated
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from Cookie header
    pub cookies: HashMap<String, String>,
    /// Parsed query string parameters
    pub query_params: HashMap<String, String>,
    /// Parsed JSON body (if the payload parses as JSON)
    pub body: Option<serde_json::Value>,
}

/// Parse the `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Parse an incoming HTTP request into a [`ParsedRequest`]
///
/// Extracts method, path, headers, cookies and query params, then consumes
/// the body last. The body is kept as JSON when it parses and dropped
/// otherwise.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let request_id = RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str));

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);
    debug!(
        request_id = %request_id,
        header_count = headers.len(),
        cookie_count = cookies.len(),
        param_count = query_params.len(),
        "request metadata extracted"
    );

    // Body is read last; may_minihttp invalidates earlier accessors once the
    // body reader is taken.
    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => serde_json::from_str(&body_str).ok(),
            _ => None,
        }
    };

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        has_body = body.is_some(),
        "HTTP request parsed"
    );

    ParsedRequest {
        request_id,
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    }
}
