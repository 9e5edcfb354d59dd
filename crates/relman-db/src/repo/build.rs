//! Builds table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relman_core::Result;
use relman_core::build::Build;
use relman_core::id::{BuildId, ReleaseId, SystemId};
use relman_core::store::BuildRepo;
use uuid::Uuid;

use crate::{DbError, PgTx};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildRow {
    pub id: Uuid,
    pub system_id: Uuid,
    pub release_id: Option<Uuid>,
    pub version: String,
    pub build_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BuildRow> for Build {
    fn from(row: BuildRow) -> Self {
        Build {
            id: row.id.into(),
            system_id: row.system_id.into(),
            release_id: row.release_id.map(ReleaseId::from),
            version: row.version,
            build_date: row.build_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PgTx {
    async fn fetch_builds(&mut self, filter: &str, bind: Option<Uuid>) -> Result<Vec<Build>> {
        let sql = format!("SELECT * FROM builds {filter} ORDER BY build_date, id");
        let mut query = sqlx::query_as::<_, BuildRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&mut *self.tx).await.map_err(DbError::from)?;
        Ok(rows.into_iter().map(Build::from).collect())
    }
}

#[async_trait]
impl BuildRepo for PgTx {
    async fn get_build(&mut self, id: BuildId) -> Result<Option<Build>> {
        let row = sqlx::query_as::<_, BuildRow>("SELECT * FROM builds WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Build::from))
    }

    async fn list_builds(&mut self) -> Result<Vec<Build>> {
        self.fetch_builds("", None).await
    }

    async fn list_builds_for_system(&mut self, system: SystemId) -> Result<Vec<Build>> {
        self.fetch_builds("WHERE system_id = $1", Some(system.into())).await
    }

    async fn list_builds_for_release(&mut self, release: ReleaseId) -> Result<Vec<Build>> {
        self.fetch_builds("WHERE release_id = $1", Some(release.into())).await
    }

    async fn find_build(&mut self, system: SystemId, release: ReleaseId) -> Result<Option<Build>> {
        let row = sqlx::query_as::<_, BuildRow>("SELECT * FROM builds WHERE system_id = $1 AND release_id = $2")
            .bind(system.as_uuid())
            .bind(release.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Build::from))
    }

    async fn count_builds_for_system(&mut self, system: SystemId) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM builds WHERE system_id = $1")
            .bind(system.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(count as u64)
    }

    async fn insert_build(&mut self, build: &Build) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO builds (id, system_id, release_id, version, build_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(build.id.as_uuid())
        .bind(build.system_id.as_uuid())
        .bind(build.release_id.map(Uuid::from))
        .bind(&build.version)
        .bind(build.build_date)
        .bind(build.created_at)
        .bind(build.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update_build(&mut self, build: &Build) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE builds
            SET release_id = $2, version = $3, build_date = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(build.id.as_uuid())
        .bind(build.release_id.map(Uuid::from))
        .bind(&build.version)
        .bind(build.build_date)
        .bind(build.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("build {}", build.id)).into());
        }
        Ok(())
    }

    async fn delete_build(&mut self, id: BuildId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM builds WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_build_keeps_optional_release() {
        let now = Utc::now();
        let row = BuildRow {
            id: Uuid::now_v7(),
            system_id: Uuid::now_v7(),
            release_id: None,
            version: "1.2.0".to_string(),
            build_date: now,
            created_at: now,
            updated_at: now,
        };
        let build = Build::from(row.clone());
        assert_eq!(build.release_id, None);
        assert_eq!(build.system_id, SystemId::from(row.system_id));
        assert_eq!(build.version, "1.2.0");
    }
}
