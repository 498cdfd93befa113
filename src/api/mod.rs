pub mod commissions;
pub mod health;
pub mod orders;

use crate::db::Repository;
use crate::orchestration::CommissionGenerator;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub generator: Arc<CommissionGenerator>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, generator: Arc<CommissionGenerator>) -> Self {
        Self { repo, generator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/orders/commissions", post(orders::generate_commissions))
        .route("/v1/commissions/summary", get(commissions::get_summary))
        .route("/v1/commissions/approve", post(commissions::approve))
        .route("/v1/commissions/pay", post(commissions::mark_paid))
        .layer(cors)
        .with_state(state)
}
