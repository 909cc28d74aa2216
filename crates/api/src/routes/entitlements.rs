use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use hirewire_core::entitlement::{DenialReason, EntitlementStatus, UsageOutcome};
use serde::Serialize;

use crate::{
    error::{ApiResult, AppError, ResultExt},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/customers/{customer_id}/entitlement", get(get_entitlement))
        .route("/v1/customers/{customer_id}/job-posts", post(use_job_post))
        .with_state(state)
}

async fn get_entitlement(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<EntitlementStatus>> {
    let status = state
        .entitlements
        .status_for_customer(&customer_id)
        .await
        .for_request(&request_id)?;
    Ok(Json(status))
}

#[derive(Debug, Serialize)]
struct JobPostResponse {
    success: bool,
    reason: Option<DenialReason>,
    job_posts_used: i32,
    job_posts_remaining: i32,
}

async fn use_job_post(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<JobPostResponse>> {
    let subscription = state
        .entitlements
        .current_for_customer(&customer_id)
        .await
        .for_request(&request_id)?
        .ok_or_else(|| {
            AppError::NotFound(format!("no subscription for customer {customer_id}"))
                .with_request_id(&request_id)
        })?;

    let response = match state
        .entitlements
        .consume_job_post(&subscription)
        .await
        .for_request(&request_id)?
    {
        UsageOutcome::Consumed(usage) => JobPostResponse {
            success: true,
            reason: None,
            job_posts_used: usage.job_posts_used,
            job_posts_remaining: usage.job_posts_remaining,
        },
        UsageOutcome::Denied(reason) => {
            let usage = state
                .entitlements
                .current_for_customer(&customer_id)
                .await
                .for_request(&request_id)?
                .map_or(subscription.usage(), |fresh| fresh.usage());
            JobPostResponse {
                success: false,
                reason: Some(reason),
                job_posts_used: usage.job_posts_used,
                job_posts_remaining: usage.job_posts_remaining,
            }
        }
    };
    Ok(Json(response))
}
