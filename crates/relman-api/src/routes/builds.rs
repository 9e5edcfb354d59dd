//! Build endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use relman_core::access::{Action, Resource};
use relman_core::build::{Build, BuildUpdate, NewBuild};
use relman_core::id::{BuildId, ReleaseId, SystemId};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, nullable};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_builds).post(create_build))
        .route("/{id}", get(get_build).put(update_build).delete(delete_build))
}

#[derive(Debug, Deserialize)]
struct CreateBuildRequest {
    system_id: SystemId,
    #[serde(default)]
    release_id: Option<ReleaseId>,
    version: String,
    /// Defaults to the time of the request.
    #[serde(default)]
    build_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct UpdateBuildRequest {
    #[serde(default)]
    system_id: Option<SystemId>,
    #[serde(default, deserialize_with = "nullable")]
    release_id: Option<Option<ReleaseId>>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    build_date: Option<DateTime<Utc>>,
}

async fn list_builds(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Build>>, ApiError> {
    caller.require(Resource::Build, Action::Read)?;
    Ok(Json(state.engine.builds.list().await?))
}

async fn create_build(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateBuildRequest>,
) -> Result<(StatusCode, Json<Build>), ApiError> {
    caller.require(Resource::Build, Action::Create)?;
    let build = state
        .engine
        .builds
        .create(NewBuild {
            system_id: req.system_id,
            release_id: req.release_id,
            version: req.version,
            build_date: req.build_date.unwrap_or_else(Utc::now),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(build)))
}

async fn get_build(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BuildId>,
) -> Result<Json<Build>, ApiError> {
    caller.require(Resource::Build, Action::Read)?;
    Ok(Json(state.engine.builds.get(id).await?))
}

async fn update_build(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BuildId>,
    ApiJson(req): ApiJson<UpdateBuildRequest>,
) -> Result<Json<Build>, ApiError> {
    caller.require(Resource::Build, Action::Update)?;
    let update = BuildUpdate {
        system_id: req.system_id,
        release_id: req.release_id,
        version: req.version,
        build_date: req.build_date,
    };
    Ok(Json(state.engine.builds.update(id, update).await?))
}

async fn delete_build(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BuildId>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::Build, Action::Delete)?;
    state.engine.builds.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
