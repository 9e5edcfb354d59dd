//! API routes.

pub mod builds;
pub mod environment_groups;
pub mod environments;
pub mod health;
pub mod releases;
pub mod systems;

use axum::Router;

use crate::AppState;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .merge(health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/systems", systems::router())
        .nest("/releases", releases::router())
        .nest("/builds", builds::router())
        .nest("/environments", environments::router())
        .nest("/environment-groups", environment_groups::router())
}
