use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use nanoid::nanoid;

use crate::state::RequestId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Tag every request with an id, keeping one set by an upstream proxy.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(inbound_id)
        .unwrap_or_else(|| format!("req_{}", nanoid!(16)));

    req.extensions_mut().insert(RequestId(request_id.clone()));
    let mut resp = next.run(req).await;
    if let Ok(value) = request_id.parse() {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

fn inbound_id(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    let valid = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| value.to_string())
}
