//! Systems table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relman_core::Result;
use relman_core::id::SystemId;
use relman_core::store::SystemRepo;
use relman_core::system::{System, SystemStatus};
use uuid::Uuid;

use super::parse_column;
use crate::{DbError, PgTx};

/// Database row for systems.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub system_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SystemRow> for System {
    type Error = DbError;

    fn try_from(row: SystemRow) -> std::result::Result<Self, Self::Error> {
        Ok(System {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            parent_id: row.parent_id.map(SystemId::from),
            system_type: parse_column("systems.system_type", &row.system_type)?,
            status: parse_column("systems.status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn systems(rows: Vec<SystemRow>) -> Result<Vec<System>> {
    Ok(rows
        .into_iter()
        .map(System::try_from)
        .collect::<std::result::Result<Vec<_>, DbError>>()?)
}

#[async_trait]
impl SystemRepo for PgTx {
    async fn get_system(&mut self, id: SystemId) -> Result<Option<System>> {
        let row = sqlx::query_as::<_, SystemRow>("SELECT * FROM systems WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(System::try_from).transpose()?)
    }

    async fn list_systems(&mut self) -> Result<Vec<System>> {
        let rows = sqlx::query_as::<_, SystemRow>("SELECT * FROM systems ORDER BY name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        systems(rows)
    }

    async fn list_subsystems(&mut self, parent: SystemId) -> Result<Vec<System>> {
        let rows =
            sqlx::query_as::<_, SystemRow>("SELECT * FROM systems WHERE parent_id = $1 ORDER BY name")
                .bind(parent.as_uuid())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        systems(rows)
    }

    async fn count_subsystems(&mut self, parent: SystemId) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM systems WHERE parent_id = $1")
            .bind(parent.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(count as u64)
    }

    async fn insert_system(&mut self, system: &System) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO systems (id, name, description, parent_id, system_type, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(system.id.as_uuid())
        .bind(&system.name)
        .bind(&system.description)
        .bind(system.parent_id.map(Uuid::from))
        .bind(system.system_type.as_str())
        .bind(system.status.as_str())
        .bind(system.created_at)
        .bind(system.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_system(&mut self, system: &System) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE systems
            SET name = $2, description = $3, parent_id = $4, system_type = $5, status = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(system.id.as_uuid())
        .bind(&system.name)
        .bind(&system.description)
        .bind(system.parent_id.map(Uuid::from))
        .bind(system.system_type.as_str())
        .bind(system.status.as_str())
        .bind(system.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("system {}", system.id)).into());
        }
        Ok(())
    }

    async fn set_subsystem_status(
        &mut self,
        parent: SystemId,
        status: SystemStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE systems SET status = $2, updated_at = $3 WHERE parent_id = $1")
            .bind(parent.as_uuid())
            .bind(status.as_str())
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }

    async fn delete_system(&mut self, id: SystemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM systems WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
