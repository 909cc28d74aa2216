use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use hirewire_core::auth::verify_service_token;
use tracing::warn;

use crate::{
    error::{ApiError, AppError},
    state::{AppState, RequestId},
};

/// Require `Authorization: Bearer <service token>` on internal routes.
pub async fn service_token_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(|| RequestId(String::new()));

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            AppError::Unauthorized("missing authorization header".to_string())
                .with_request_id(&request_id)
        })?;

    let token = parse_bearer(header_value)
        .ok_or_else(|| {
            AppError::Unauthorized("invalid authorization header".to_string())
                .with_request_id(&request_id)
        })?;

    if !verify_service_token(&state.settings.service_token, token) {
        warn!(request_id = %request_id.0, path = %req.uri().path(), "rejected service token");
        return Err(
            AppError::Unauthorized("invalid service token".to_string()).with_request_id(&request_id),
        );
    }

    Ok(next.run(req).await)
}

fn parse_bearer(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme != "Bearer" || token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        let value = HeaderValue::from_static("Bearer hwr_svc_123");
        assert_eq!(parse_bearer(&value), Some("hwr_svc_123"));
    }

    #[test]
    fn test_parse_bearer_rejects_other_schemes() {
        assert_eq!(parse_bearer(&HeaderValue::from_static("Basic abc")), None);
        assert_eq!(parse_bearer(&HeaderValue::from_static("Bearer ")), None);
        assert_eq!(parse_bearer(&HeaderValue::from_static("Bearer")), None);
    }
}
