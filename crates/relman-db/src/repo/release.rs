//! Releases table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relman_core::Result;
use relman_core::id::ReleaseId;
use relman_core::release::Release;
use relman_core::store::ReleaseRepo;
use uuid::Uuid;

use super::parse_column;
use crate::{DbError, PgTx};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReleaseRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub release_date: DateTime<Utc>,
    pub status: String,
    pub release_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReleaseRow> for Release {
    type Error = DbError;

    fn try_from(row: ReleaseRow) -> std::result::Result<Self, Self::Error> {
        Ok(Release {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            release_date: row.release_date,
            status: parse_column("releases.status", &row.status)?,
            release_type: parse_column("releases.release_type", &row.release_type)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReleaseRepo for PgTx {
    async fn get_release(&mut self, id: ReleaseId) -> Result<Option<Release>> {
        let row = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Release::try_from).transpose()?)
    }

    async fn list_releases(&mut self) -> Result<Vec<Release>> {
        let rows = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases ORDER BY release_date DESC, name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(Release::try_from)
            .collect::<std::result::Result<Vec<_>, DbError>>()?)
    }

    async fn insert_release(&mut self, release: &Release) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO releases (id, name, description, release_date, status, release_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(release.id.as_uuid())
        .bind(&release.name)
        .bind(&release.description)
        .bind(release.release_date)
        .bind(release.status.as_str())
        .bind(release.release_type.as_str())
        .bind(release.created_at)
        .bind(release.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_release(&mut self, release: &Release) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE releases
            SET name = $2, description = $3, release_date = $4, status = $5, release_type = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(release.id.as_uuid())
        .bind(&release.name)
        .bind(&release.description)
        .bind(release.release_date)
        .bind(release.status.as_str())
        .bind(release.release_type.as_str())
        .bind(release.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("release {}", release.id)).into());
        }
        Ok(())
    }

    async fn delete_release(&mut self, id: ReleaseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
