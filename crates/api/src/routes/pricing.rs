use axum::{extract::State, routing::get, Extension, Json, Router};
use hirewire_core::catalog::PlanOffer;
use serde::Serialize;

use crate::{
    error::{ApiResult, ResultExt},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/pricing/plans", get(list_plans))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct PlansResponse {
    plans: Vec<PlanOffer>,
}

async fn list_plans(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<PlansResponse>> {
    let plans = state
        .plans
        .list_active_plans()
        .await
        .for_request(&request_id)?;
    Ok(Json(PlansResponse {
        plans: plans.iter().map(PlanOffer::from).collect(),
    }))
}
