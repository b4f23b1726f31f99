//! 路由组装

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::user::handler::{self, AppState};
use crate::core::middleware::request_logging_middleware;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/health", get(handler::health_check))
        .route("/users", get(handler::list_users).post(handler::create_user))
        .route("/users/sample", post(handler::create_sample_users))
        .route("/users/search/:query", get(handler::search_users))
        .route(
            "/users/:id",
            get(handler::get_user)
                .put(handler::update_user)
                .delete(handler::delete_user),
        )
        .route("/proxysql/stats", get(handler::routing_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
