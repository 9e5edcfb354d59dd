//! Environment and environment membership endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use relman_core::access::{Action, Resource};
use relman_core::environment::{Environment, EnvironmentStatus, EnvironmentType, EnvironmentUpdate, NewEnvironment};
use relman_core::id::{EnvironmentGroupId, EnvironmentId, ReleaseId, SystemId};
use relman_core::membership::{AddSystem, MemberSummary, MembershipStatus, MembershipUpdate};
use relman_engine::{AddedSystems, EnvironmentSystemDetail, EnvironmentSystemsListing, SyncReport};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, nullable};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_environments).post(create_environment))
        .route(
            "/{id}",
            get(get_environment).put(update_environment).delete(delete_environment),
        )
        .route("/{id}/systems", get(list_environment_systems).post(add_system))
        .route("/{id}/systems/sync", post(sync_versions))
        .route(
            "/{id}/systems/{system_id}",
            get(get_environment_system)
                .put(update_environment_system)
                .delete(remove_environment_system),
        )
}

#[derive(Debug, Deserialize)]
struct CreateEnvironmentRequest {
    name: String,
    #[serde(rename = "type")]
    environment_type: EnvironmentType,
    release_id: ReleaseId,
    #[serde(default)]
    status: Option<EnvironmentStatus>,
    #[serde(default, rename = "environment_group_id", alias = "group_id")]
    group_id: Option<EnvironmentGroupId>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<CreateEnvironmentRequest> for NewEnvironment {
    fn from(req: CreateEnvironmentRequest) -> Self {
        NewEnvironment {
            name: req.name,
            environment_type: req.environment_type,
            release_id: req.release_id,
            status: req.status,
            group_id: req.group_id,
            url: req.url,
            description: req.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateEnvironmentRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    environment_type: Option<EnvironmentType>,
    #[serde(default)]
    release_id: Option<ReleaseId>,
    #[serde(default)]
    status: Option<EnvironmentStatus>,
    #[serde(
        default,
        rename = "environment_group_id",
        alias = "group_id",
        deserialize_with = "nullable"
    )]
    group_id: Option<Option<EnvironmentGroupId>>,
    #[serde(default, deserialize_with = "nullable")]
    url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
}

impl From<UpdateEnvironmentRequest> for EnvironmentUpdate {
    fn from(req: UpdateEnvironmentRequest) -> Self {
        EnvironmentUpdate {
            name: req.name,
            environment_type: req.environment_type,
            release_id: req.release_id,
            status: req.status,
            group_id: req.group_id,
            url: req.url,
            description: req.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddSystemRequest {
    system_id: SystemId,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    status: Option<MembershipStatus>,
}

#[derive(Debug, Deserialize)]
struct UpdateEnvironmentSystemRequest {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    status: Option<MembershipStatus>,
}

async fn list_environments(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Environment>>, ApiError> {
    caller.require(Resource::Environment, Action::Read)?;
    Ok(Json(state.engine.environments.list().await?))
}

async fn create_environment(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateEnvironmentRequest>,
) -> Result<(StatusCode, Json<Environment>), ApiError> {
    caller.require(Resource::Environment, Action::Create)?;
    let environment = state.engine.environments.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(environment)))
}

async fn get_environment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
) -> Result<Json<Environment>, ApiError> {
    caller.require(Resource::Environment, Action::Read)?;
    Ok(Json(state.engine.environments.get(id).await?))
}

async fn update_environment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
    ApiJson(req): ApiJson<UpdateEnvironmentRequest>,
) -> Result<Json<Environment>, ApiError> {
    caller.require(Resource::Environment, Action::Update)?;
    Ok(Json(state.engine.environments.update(id, req.into()).await?))
}

async fn delete_environment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::Environment, Action::Delete)?;
    state.engine.environments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_environment_systems(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
) -> Result<Json<EnvironmentSystemsListing>, ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Read)?;
    Ok(Json(state.engine.membership.list(id).await?))
}

async fn add_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
    ApiJson(req): ApiJson<AddSystemRequest>,
) -> Result<(StatusCode, Json<AddedSystems>), ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Create)?;
    let request = AddSystem {
        system_id: req.system_id,
        version: req.version,
        status: req.status,
    };
    let added = state.engine.membership.add(id, request).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn sync_versions(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<EnvironmentId>,
) -> Result<Json<SyncReport>, ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Update)?;
    Ok(Json(state.engine.membership.sync(id).await?))
}

async fn get_environment_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((id, system_id)): ApiPath<(EnvironmentId, SystemId)>,
) -> Result<Json<EnvironmentSystemDetail>, ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Read)?;
    Ok(Json(state.engine.membership.get(id, system_id).await?))
}

async fn update_environment_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((id, system_id)): ApiPath<(EnvironmentId, SystemId)>,
    ApiJson(req): ApiJson<UpdateEnvironmentSystemRequest>,
) -> Result<Json<MemberSummary>, ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Update)?;
    let update = MembershipUpdate {
        version: req.version,
        status: req.status,
    };
    Ok(Json(state.engine.membership.update(id, system_id, update).await?))
}

async fn remove_environment_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((id, system_id)): ApiPath<(EnvironmentId, SystemId)>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::EnvironmentSystem, Action::Delete)?;
    state.engine.membership.remove(id, system_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
