//! Caller identity and permission checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use relman_core::access::{Action, Grants, Permission, Resource};
use relman_core::id::UserId;
use tracing::warn;

use crate::AppState;
use crate::error::ApiError;

/// Header set by the authenticating proxy in front of the service.
pub const USER_HEADER: &str = "x-authenticated-user";

/// The authenticated caller and everything they were granted.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: UserId,
    pub grants: Grants,
}

impl Caller {
    pub fn require(&self, resource: Resource, action: Action) -> Result<(), ApiError> {
        let permission = Permission::new(resource, action);
        if let Err(err) = self.grants.authorize(&permission) {
            warn!(user_id = %self.user, permission = %permission, "Access denied");
            return Err(err.into());
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing authenticated user".to_string()))?;
        let user = header
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .ok_or_else(|| ApiError::Unauthorized("invalid authenticated user".to_string()))?;

        let grants = state.permissions.grants_for(user).await?;
        Ok(Caller { user, grants })
    }
}
