use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn pharmacy_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/batches", post(handlers::create_batch))
        .route("/batches", get(handlers::list_batches))
        .route("/batches/{batch_id}", get(handlers::get_batch))
        .route("/batches/{batch_id}/adjust", post(handlers::adjust_stock))
        .route("/batches/{batch_id}/transactions", get(handlers::list_transactions))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
