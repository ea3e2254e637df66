pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Guest-facing API and gateway webhook
        .nest("/api", api_routes())

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(handlers::bookings::create))
        .route("/bookings/:id", get(handlers::bookings::get))
        .route("/bookings/:id/proofs", post(handlers::bookings::submit_proof))
        .route("/bookings/:id/refund-quote", get(handlers::bookings::refund_quote))
        // Authenticated by signature, not by token
        .route("/payments/webhook", post(handlers::payments::webhook))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", get(handlers::admin::list_bookings))
        .route("/bookings/:id/cancel", post(handlers::admin::cancel_booking))
        .route("/bookings/:id/refund", post(handlers::admin::refund_booking))
        .route("/bookings/:id/sync", post(handlers::admin::sync_booking))
        .route("/proofs/:id/verify", post(handlers::admin::verify_proof))
        .route("/proofs/:id/reject", post(handlers::admin::reject_proof))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
