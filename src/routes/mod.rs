use crate::handlers::{
    auth::{login, register},
    collections::{
        add_favourite, add_history, get_favourites, get_history, remove_favourite, remove_history,
    },
    health::health_check,
};
use crate::middleware::rate_limit::{LoginConfig, rate_limit_envelope};
use crate::state::AppState;
use axum::{
    Router,
    handler::Handler,
    middleware::map_response,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Builds the whole HTTP surface.
///
/// `login_limit` is optional so tests (and anyone behind their own limiter)
/// can leave it off. Everything under `/api/user` except register and login
/// requires a token; that's enforced by the `AuthenticatedUser` extractor in
/// each handler, not by a layer here.
pub fn create_routes(state: AppState, login_limit: Option<Arc<LoginConfig>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let login_route = match login_limit {
        Some(conf) => post(
            login
                .layer(GovernorLayer::new(conf))
                .layer(map_response(rate_limit_envelope)),
        ),
        None => post(login),
    };

    let user_routes = Router::new()
        .route("/register", post(register))
        .route("/login", login_route)
        .route("/favourites", get(get_favourites))
        .route(
            "/favourites/{id}",
            put(add_favourite).delete(remove_favourite),
        )
        .route("/history", get(get_history))
        .route("/history/{id}", put(add_history).delete(remove_history));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/user", user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
