//! Environment group endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use relman_core::access::{Action, Resource};
use relman_core::environment::{EnvironmentGroup, EnvironmentGroupUpdate, NewEnvironmentGroup};
use relman_core::id::EnvironmentGroupId;
use relman_engine::EnvironmentGroupDetail;
use serde::Deserialize;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, nullable};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/{id}", get(get_group).put(update_group).delete(delete_group))
}

#[derive(Debug, Deserialize)]
struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateGroupRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
}

async fn list_groups(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<EnvironmentGroup>>, ApiError> {
    caller.require(Resource::EnvironmentGroup, Action::Read)?;
    Ok(Json(state.engine.environments.list_groups().await?))
}

async fn create_group(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<EnvironmentGroup>), ApiError> {
    caller.require(Resource::EnvironmentGroup, Action::Create)?;
    let group = state
        .engine
        .environments
        .create_group(NewEnvironmentGroup {
            name: req.name,
            description: req.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn get_group(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentGroupId>,
) -> Result<Json<EnvironmentGroupDetail>, ApiError> {
    caller.require(Resource::EnvironmentGroup, Action::Read)?;
    Ok(Json(state.engine.environments.get_group(id).await?))
}

async fn update_group(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentGroupId>,
    ApiJson(req): ApiJson<UpdateGroupRequest>,
) -> Result<Json<EnvironmentGroup>, ApiError> {
    caller.require(Resource::EnvironmentGroup, Action::Update)?;
    let update = EnvironmentGroupUpdate {
        name: req.name,
        description: req.description,
    };
    Ok(Json(state.engine.environments.update_group(id, update).await?))
}

async fn delete_group(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentGroupId>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::EnvironmentGroup, Action::Delete)?;
    state.engine.environments.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
