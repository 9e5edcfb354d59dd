//! Environment systems table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relman_core::Result;
use relman_core::id::{EnvironmentId, SystemId};
use relman_core::membership::EnvironmentSystem;
use relman_core::store::MembershipRepo;
use uuid::Uuid;

use super::parse_column;
use crate::{DbError, PgTx};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnvironmentSystemRow {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub system_id: Uuid,
    pub version: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EnvironmentSystemRow> for EnvironmentSystem {
    type Error = DbError;

    fn try_from(row: EnvironmentSystemRow) -> std::result::Result<Self, Self::Error> {
        Ok(EnvironmentSystem {
            id: row.id.into(),
            environment_id: row.environment_id.into(),
            system_id: row.system_id.into(),
            version: row.version,
            status: parse_column("environment_systems.status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl MembershipRepo for PgTx {
    async fn list_environment_systems(&mut self, environment: EnvironmentId) -> Result<Vec<EnvironmentSystem>> {
        let rows = sqlx::query_as::<_, EnvironmentSystemRow>(
            "SELECT * FROM environment_systems WHERE environment_id = $1 ORDER BY created_at, id",
        )
        .bind(environment.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EnvironmentSystem::try_from)
            .collect::<std::result::Result<Vec<_>, DbError>>()?)
    }

    async fn find_environment_system(
        &mut self,
        environment: EnvironmentId,
        system: SystemId,
    ) -> Result<Option<EnvironmentSystem>> {
        let row = sqlx::query_as::<_, EnvironmentSystemRow>(
            "SELECT * FROM environment_systems WHERE environment_id = $1 AND system_id = $2",
        )
        .bind(environment.as_uuid())
        .bind(system.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(row.map(EnvironmentSystem::try_from).transpose()?)
    }

    async fn insert_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO environment_systems (id, environment_id, system_id, version, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.environment_id.as_uuid())
        .bind(member.system_id.as_uuid())
        .bind(&member.version)
        .bind(member.status.as_str())
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()> {
        let result =
            sqlx::query("UPDATE environment_systems SET version = $2, status = $3, updated_at = $4 WHERE id = $1")
                .bind(member.id.as_uuid())
                .bind(&member.version)
                .bind(member.status.as_str())
                .bind(member.updated_at)
                .execute(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("environment system {}", member.id)).into());
        }
        Ok(())
    }

    async fn delete_environment_system(&mut self, environment: EnvironmentId, system: SystemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM environment_systems WHERE environment_id = $1 AND system_id = $2")
            .bind(environment.as_uuid())
            .bind(system.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_environment_systems(&mut self, environment: EnvironmentId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM environment_systems WHERE environment_id = $1")
            .bind(environment.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }
}
