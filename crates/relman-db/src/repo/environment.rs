//! Environments and environment groups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relman_core::Result;
use relman_core::environment::{Environment, EnvironmentGroup};
use relman_core::id::{EnvironmentGroupId, EnvironmentId};
use relman_core::store::{EnvironmentGroupRepo, EnvironmentRepo};
use uuid::Uuid;

use super::parse_column;
use crate::{DbError, PgTx};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnvironmentRow {
    pub id: Uuid,
    pub name: String,
    pub environment_type: String,
    pub status: String,
    pub release_id: Uuid,
    pub group_id: Option<Uuid>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EnvironmentRow> for Environment {
    type Error = DbError;

    fn try_from(row: EnvironmentRow) -> std::result::Result<Self, Self::Error> {
        Ok(Environment {
            id: row.id.into(),
            name: row.name,
            environment_type: parse_column("environments.environment_type", &row.environment_type)?,
            status: parse_column("environments.status", &row.status)?,
            release_id: row.release_id.into(),
            group_id: row.group_id.map(EnvironmentGroupId::from),
            url: row.url,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnvironmentGroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EnvironmentGroupRow> for EnvironmentGroup {
    fn from(row: EnvironmentGroupRow) -> Self {
        EnvironmentGroup {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn environments(rows: Vec<EnvironmentRow>) -> Result<Vec<Environment>> {
    Ok(rows
        .into_iter()
        .map(Environment::try_from)
        .collect::<std::result::Result<Vec<_>, DbError>>()?)
}

#[async_trait]
impl EnvironmentRepo for PgTx {
    async fn get_environment(&mut self, id: EnvironmentId) -> Result<Option<Environment>> {
        let row = sqlx::query_as::<_, EnvironmentRow>("SELECT * FROM environments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Environment::try_from).transpose()?)
    }

    async fn list_environments(&mut self) -> Result<Vec<Environment>> {
        let rows = sqlx::query_as::<_, EnvironmentRow>("SELECT * FROM environments ORDER BY name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        environments(rows)
    }

    async fn list_environments_in_group(&mut self, group: EnvironmentGroupId) -> Result<Vec<Environment>> {
        let rows =
            sqlx::query_as::<_, EnvironmentRow>("SELECT * FROM environments WHERE group_id = $1 ORDER BY name")
                .bind(group.as_uuid())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        environments(rows)
    }

    async fn insert_environment(&mut self, environment: &Environment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO environments
                (id, name, environment_type, status, release_id, group_id, url, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(environment.id.as_uuid())
        .bind(&environment.name)
        .bind(environment.environment_type.as_str())
        .bind(environment.status.as_str())
        .bind(environment.release_id.as_uuid())
        .bind(environment.group_id.map(Uuid::from))
        .bind(&environment.url)
        .bind(&environment.description)
        .bind(environment.created_at)
        .bind(environment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_environment(&mut self, environment: &Environment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE environments
            SET name = $2, environment_type = $3, status = $4, release_id = $5, group_id = $6,
                url = $7, description = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(environment.id.as_uuid())
        .bind(&environment.name)
        .bind(environment.environment_type.as_str())
        .bind(environment.status.as_str())
        .bind(environment.release_id.as_uuid())
        .bind(environment.group_id.map(Uuid::from))
        .bind(&environment.url)
        .bind(&environment.description)
        .bind(environment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("environment {}", environment.id)).into());
        }
        Ok(())
    }

    async fn delete_environment(&mut self, id: EnvironmentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM environments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EnvironmentGroupRepo for PgTx {
    async fn get_group(&mut self, id: EnvironmentGroupId) -> Result<Option<EnvironmentGroup>> {
        let row = sqlx::query_as::<_, EnvironmentGroupRow>("SELECT * FROM environment_groups WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(EnvironmentGroup::from))
    }

    async fn list_groups(&mut self) -> Result<Vec<EnvironmentGroup>> {
        let rows = sqlx::query_as::<_, EnvironmentGroupRow>("SELECT * FROM environment_groups ORDER BY name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().map(EnvironmentGroup::from).collect())
    }

    async fn insert_group(&mut self, group: &EnvironmentGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO environment_groups (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group.id.as_uuid())
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_group(&mut self, group: &EnvironmentGroup) -> Result<()> {
        let result =
            sqlx::query("UPDATE environment_groups SET name = $2, description = $3, updated_at = $4 WHERE id = $1")
                .bind(group.id.as_uuid())
                .bind(&group.name)
                .bind(&group.description)
                .bind(group.updated_at)
                .execute(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("environment group {}", group.id)).into());
        }
        Ok(())
    }

    async fn delete_group(&mut self, id: EnvironmentGroupId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM environment_groups WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
