//! Users, roles and granted access patterns.

use async_trait::async_trait;
use relman_core::Result;
use relman_core::access::{Grants, PermissionStore};
use relman_core::id::UserId;
use sqlx::PgPool;

use crate::DbError;

/// PostgreSQL implementation of PermissionStore.
#[derive(Clone)]
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn grants_for(&self, user: UserId) -> Result<Grants> {
        let is_admin = sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1")
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        let Some(is_admin) = is_admin else {
            return Ok(Grants::default());
        };

        let patterns = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT a.access_name
            FROM access a
            JOIN role_access ra ON ra.access_id = a.id
            JOIN user_roles ur ON ur.role_id = ra.role_id
            WHERE ur.user_id = $1
            ORDER BY a.access_name
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(Grants { is_admin, patterns })
    }
}
