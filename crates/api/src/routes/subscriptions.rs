use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use hirewire_core::types::{BillingInterval, PlanTier, Subscription, SubscriptionStatus, UsageCounters};
use serde::Deserialize;

use crate::{
    error::{ApiResult, AppError, ResultExt},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/subscriptions", post(create_subscription))
        .route("/v1/subscriptions/{id}/status", post(update_status))
        .route("/v1/subscriptions/{id}/reset-usage", post(reset_usage))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionRequest {
    customer_id: String,
    plan_type: PlanTier,
    #[serde(default = "default_interval")]
    billing_interval: BillingInterval,
}

fn default_interval() -> BillingInterval {
    BillingInterval::Monthly
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: SubscriptionStatus,
}

fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    request_id: &RequestId,
) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()).with_request_id(request_id))
}

/// Start a trial subscription for a customer.
async fn create_subscription(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let payload = json_body(payload, &request_id)?;
    let customer_id = payload.customer_id.trim();
    if customer_id.is_empty() {
        return Err(AppError::BadRequest("customer_id required".to_string()).with_request_id(&request_id));
    }

    let plan = state
        .plans
        .plan_by_tier(payload.plan_type)
        .await
        .for_request(&request_id)?;
    if !plan.is_some_and(|plan| plan.is_active) {
        return Err(AppError::NotFound(format!("pricing plan {}", payload.plan_type.as_str()))
            .with_request_id(&request_id));
    }

    let subscription = state
        .entitlements
        .provision(customer_id, payload.plan_type, payload.billing_interval)
        .await
        .for_request(&request_id)?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Apply a status reported by the billing provider.
async fn update_status(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Subscription>> {
    let payload = json_body(payload, &request_id)?;
    let subscription = state
        .entitlements
        .update_status(&id, payload.status)
        .await
        .for_request(&request_id)?;
    Ok(Json(subscription))
}

async fn reset_usage(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Json<UsageCounters>> {
    let usage = state
        .entitlements
        .reset_usage(&id)
        .await
        .for_request(&request_id)?;
    Ok(Json(usage))
}
