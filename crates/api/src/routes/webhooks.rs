use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use hirewire_core::types::WebhookCategory;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    error::{ApiResult, AppError, ResultExt},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhooks/{category}",
            post(receive_webhook).options(webhook_preflight),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct WebhookAccepted {
    status: &'static str,
    webhook_id: String,
    event_type: String,
}

fn category_for(slug: &str, request_id: &RequestId) -> ApiResult<WebhookCategory> {
    WebhookCategory::from_slug(slug).ok_or_else(|| {
        AppError::NotFound(format!("unknown webhook category: {slug}")).with_request_id(request_id)
    })
}

/// Store and handle one provider delivery. Duplicates and handler failures
/// are still acknowledged so the provider stops redelivering.
async fn receive_webhook(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(slug): Path<String>,
    body: Bytes,
) -> ApiResult<Json<WebhookAccepted>> {
    let category = category_for(&slug, &request_id)?;

    let payload: Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(category = %category, error = %err, "malformed webhook body");
        AppError::BadRequest(format!("invalid JSON: {err}")).with_request_id(&request_id)
    })?;

    let ingested = state
        .webhooks
        .ingest(category, payload)
        .await
        .for_request(&request_id)?;

    Ok(Json(WebhookAccepted {
        status: "received",
        webhook_id: ingested.event.id,
        event_type: ingested.event.event_type,
    }))
}

async fn webhook_preflight(
    Extension(request_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    category_for(&slug, &request_id)?;
    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
        Json(serde_json::json!({})),
    ))
}
