pub mod entitlements;
pub mod health;
pub mod pricing;
pub mod subscriptions;
pub mod webhooks;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{auth::service_token_auth, request_id::request_id};
use crate::state::AppState;

/// Service-token protected routes.
pub fn v1_router(state: AppState) -> Router {
    Router::new()
        .merge(entitlements::router(state.clone()))
        .merge(subscriptions::router(state.clone()))
        .route_layer(from_fn_with_state(state, service_token_auth))
}

/// Routes callable without a service token. Webhook endpoints answer their
/// own `OPTIONS`, so the CORS layer stays off them.
pub fn public_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(pricing::router(state.clone()))
        .layer(CorsLayer::permissive())
        .merge(webhooks::router(state))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_router(state.clone()))
        .merge(v1_router(state))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
}
