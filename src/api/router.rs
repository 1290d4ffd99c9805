use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::admission_middleware;
use super::state::AppState;

/// Probe routes only, without state
pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .layer(TraceLayer::new_for_http())
}

/// Full router with admission control over every route
pub fn create_router_with_state(state: AppState) -> Router {
    merge_routes(Router::new(), state)
}

/// Mounts the probe and admin routes next to the application's own routes
/// and puts admission control in front of all of them
pub fn merge_routes(routes: Router<AppState>, state: AppState) -> Router {
    let mut router = routes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check));

    if state.admin_token.is_some() {
        router = router.nest("/admin", admin::create_admin_router());
    }

    router
        .layer(from_fn_with_state(state.clone(), admission_middleware))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
