use crate::middleware::Intercept;
use may_minihttp::Response;
use serde_json::Value;
use std::collections::HashMap;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Push a dynamically built header line onto the response.
///
/// may_minihttp keeps `&'static str` header slices; runtime-built lines are
/// leaked to satisfy that. Response headers are small and bounded per
/// request.
fn push_header(res: &mut Response, line: String) {
    res.header(Box::leak(line.into_boxed_str()));
}

/// Write a handler's response: status, extra headers, then the body. String
/// bodies go out as `text/plain`, everything else as JSON; an explicit
/// `Content-Type` in `headers` wins.
pub fn write_handler_response(
    res: &mut Response,
    status: u16,
    body: Value,
    headers: &HashMap<String, String>,
) {
    res.status_code(status as usize, status_reason(status));
    let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
    for (name, value) in headers {
        push_header(res, format!("{name}: {value}"));
    }
    match body {
        Value::String(s) => {
            if !has_content_type {
                res.header("Content-Type: text/plain");
            }
            res.body_vec(s.into_bytes());
        }
        other => {
            if !has_content_type {
                res.header("Content-Type: application/json");
            }
            res.body_vec(other.to_string().into_bytes());
        }
    }
}

/// Write a JSON error envelope.
pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

/// Write a middleware intercept as the full response.
pub fn write_intercept(res: &mut Response, intercept: Intercept) {
    res.status_code(intercept.status as usize, status_reason(intercept.status));
    push_header(res, format!("Content-Type: {}", intercept.content_type));
    res.body_vec(intercept.body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(503), "Service Unavailable");
        assert_eq!(status_reason(299), "OK");
    }
}
