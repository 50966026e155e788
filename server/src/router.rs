// Router configuration

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{event_handlers::*, health_handlers::*, workspace_handlers::*},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_handler))
        // Identity provider webhook intake
        .route("/api/events/identity", post(identity_event_handler))
        // Workspaces
        .route("/api/workspaces", get(get_user_workspaces_handler))
        .route(
            "/api/workspaces/{workspace_id}/members",
            get(list_members_handler).post(add_member_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
