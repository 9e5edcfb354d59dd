//! Catalog system endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use relman_core::access::{Action, Resource};
use relman_core::build::Build;
use relman_core::id::SystemId;
use relman_core::system::{NewSystem, System, SystemStatus, SystemType, SystemUpdate};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, nullable};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_systems).post(create_system))
        .route("/{id}", get(get_system).put(update_system).delete(delete_system))
        .route("/{id}/subsystems", get(list_subsystems))
        .route("/{id}/builds", get(list_system_builds))
}

#[derive(Debug, Deserialize)]
struct CreateSystemRequest {
    name: String,
    #[serde(rename = "type")]
    system_type: SystemType,
    #[serde(default)]
    parent_id: Option<SystemId>,
    #[serde(default)]
    status: Option<SystemStatus>,
    #[serde(default)]
    description: Option<String>,
}

impl From<CreateSystemRequest> for NewSystem {
    fn from(req: CreateSystemRequest) -> Self {
        NewSystem {
            name: req.name,
            system_type: req.system_type,
            parent_id: req.parent_id,
            status: req.status,
            description: req.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UpdateSystemRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
    #[serde(default, rename = "type")]
    system_type: Option<SystemType>,
    #[serde(default, deserialize_with = "nullable")]
    parent_id: Option<Option<SystemId>>,
    #[serde(default)]
    status: Option<SystemStatus>,
}

impl From<UpdateSystemRequest> for SystemUpdate {
    fn from(req: UpdateSystemRequest) -> Self {
        SystemUpdate {
            name: req.name,
            description: req.description,
            system_type: req.system_type,
            parent_id: req.parent_id,
            status: req.status,
        }
    }
}

async fn list_systems(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<System>>, ApiError> {
    caller.require(Resource::System, Action::Read)?;
    Ok(Json(state.engine.catalog.list().await?))
}

async fn create_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateSystemRequest>,
) -> Result<(StatusCode, Json<System>), ApiError> {
    caller.require(Resource::System, Action::Create)?;
    let system = state.engine.catalog.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(system)))
}

async fn get_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<SystemId>,
) -> Result<Json<System>, ApiError> {
    caller.require(Resource::System, Action::Read)?;
    Ok(Json(state.engine.catalog.get(id).await?))
}

async fn update_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<SystemId>,
    ApiJson(req): ApiJson<UpdateSystemRequest>,
) -> Result<Json<System>, ApiError> {
    caller.require(Resource::System, Action::Update)?;
    Ok(Json(state.engine.catalog.update(id, req.into()).await?))
}

async fn delete_system(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<SystemId>,
) -> Result<StatusCode, ApiError> {
    caller.require(Resource::System, Action::Delete)?;
    state.engine.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subsystems(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<SystemId>,
) -> Result<Json<Vec<System>>, ApiError> {
    caller.require(Resource::System, Action::Read)?;
    Ok(Json(state.engine.catalog.list_subsystems(id).await?))
}

async fn list_system_builds(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<SystemId>,
) -> Result<Json<Vec<Build>>, ApiError> {
    caller.require(Resource::Build, Action::Read)?;
    Ok(Json(state.engine.catalog.list_builds(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_keeps_null_parent() {
        let req: UpdateSystemRequest = serde_json::from_str(r#"{"type": "systems", "parent_id": null}"#).unwrap();
        let update = SystemUpdate::from(req);
        assert_eq!(update.system_type, Some(SystemType::Standalone));
        assert_eq!(update.parent_id, Some(None));
        assert_eq!(update.description, None);
    }

    #[test]
    fn test_create_request_accepts_type_alias() {
        let req: CreateSystemRequest = serde_json::from_str(r#"{"name": "Gateway", "type": "subsystem"}"#).unwrap();
        assert_eq!(req.system_type, SystemType::Subsystem);
    }
}
