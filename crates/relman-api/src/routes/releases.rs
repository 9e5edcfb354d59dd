//! Release endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use relman_core::access::{Action, Resource};
use relman_core::build::Build;
use relman_core::id::ReleaseId;
use relman_core::release::{NewRelease, Release, ReleaseStatus, ReleaseType, ReleaseUpdate};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, nullable};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_releases).post(create_release))
        .route("/{id}", get(get_release).put(update_release).delete(delete_release))
        .route("/{id}/builds", get(list_release_builds))
}

#[derive(Debug, Deserialize)]
struct CreateReleaseRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
    release_date: DateTime<Utc>,
    #[serde(default)]
    status: Option<ReleaseStatus>,
    #[serde(rename = "type")]
    release_type: ReleaseType,
}

#[derive(Debug, Deserialize)]
struct UpdateReleaseRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
    #[serde(default)]
    release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    status: Option<ReleaseStatus>,
    #[serde(default, rename = "type")]
    release_type: Option<ReleaseType>,
}

async fn list_releases(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Release>>, ApiError> {
    caller.require(Resource::Release, Action::Read)?;
    Ok(Json(state.engine.releases.list().await?))
}

async fn create_release(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateReleaseRequest>,
) -> Result<(StatusCode, Json<Release>), ApiError> {
    caller.require(Resource::Release, Action::Create)?;
    let release = state
        .engine
        .releases
        .create(NewRelease {
            name: req.name,
            description: req.description,
            release_date: req.release_date,
            status: req.status,
            release_type: req.release_type,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(release)))
}

async fn get_release(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<ReleaseId>,
) -> Result<Json<Release>, ApiError> {
    caller.require(Resource::Release, Action::Read)?;
    Ok(Json(state.engine.releases.get(id).await?))
}

async fn update_release(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<ReleaseId>,
    ApiJson(req): ApiJson<UpdateReleaseRequest>,
) -> Result<Json<Release>, ApiError> {
    caller.require(Resource::Release, Action::Update)?;
    let update = ReleaseUpdate {
        name: req.name,
        description: req.description,
        release_date: req.release_date,
        status: req.status,
        release_type: req.release_type,
    };
    Ok(Json(state.engine.releases.update(id, update).await?))
}

async fn delete_release(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<ReleaseId>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::Release, Action::Delete)?;
    state.engine.releases.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_release_builds(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<ReleaseId>,
) -> Result<Json<Vec<Build>>, ApiError> {
    caller.require(Resource::Build, Action::Read)?;
    Ok(Json(state.engine.releases.list_builds(id).await?))
}
