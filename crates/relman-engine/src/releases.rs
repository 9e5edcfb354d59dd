//! Release tracker.

use std::sync::Arc;

use chrono::Utc;
use relman_core::Result;
use relman_core::build::Build;
use relman_core::id::ReleaseId;
use relman_core::release::{self, NewRelease, Release, ReleaseUpdate};
use relman_core::store::Store;
use tracing::info;

use crate::require;

#[derive(Clone)]
pub struct Releases {
    store: Arc<dyn Store>,
}

impl Releases {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewRelease) -> Result<Release> {
        let release = release::validate_new(input, Utc::now())?;
        let mut tx = self.store.begin().await?;
        tx.insert_release(&release).await?;
        tx.commit().await?;

        info!(release_id = %release.id, name = %release.name, release_type = %release.release_type, "Created release");
        Ok(release)
    }

    pub async fn get(&self, id: ReleaseId) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        require(tx.get_release(id).await?, "release", id)
    }

    pub async fn list(&self) -> Result<Vec<Release>> {
        let mut tx = self.store.begin().await?;
        tx.list_releases().await
    }

    pub async fn update(&self, id: ReleaseId, update: ReleaseUpdate) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_release(id).await?, "release", id)?;
        let release = release::validate_update(&current, update, Utc::now())?;
        tx.update_release(&release).await?;
        tx.commit().await?;

        info!(release_id = %id, status = %release.status, "Updated release");
        Ok(release)
    }

    /// Builds of the release are kept and detached from it. A release still
    /// referenced by an environment cannot be deleted.
    pub async fn delete(&self, id: ReleaseId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_release(id).await?, "release", id)?;
        tx.delete_release(id).await?;
        tx.commit().await?;

        info!(release_id = %id, name = %current.name, "Deleted release");
        Ok(())
    }

    pub async fn list_builds(&self, id: ReleaseId) -> Result<Vec<Build>> {
        let mut tx = self.store.begin().await?;
        require(tx.get_release(id).await?, "release", id)?;
        tx.list_builds_for_release(id).await
    }
}

#[cfg(test)]
mod tests {
    use relman_core::ErrorKind;
    use relman_core::release::{ReleaseStatus, ReleaseUpdate};
    use relman_core::system::SystemType;

    use crate::fixtures;

    #[tokio::test]
    async fn test_release_lifecycle() {
        let (engine, _) = fixtures::engine();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        assert_eq!(r1.status, ReleaseStatus::Planned);

        let updated = engine
            .releases
            .update(
                r1.id,
                ReleaseUpdate {
                    status: Some(ReleaseStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ReleaseStatus::InProgress);
        assert_eq!(engine.releases.list().await.unwrap(), vec![updated]);

        engine.releases.delete(r1.id).await.unwrap();
        let err = engine.releases.get(r1.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_release_in_use_by_environment_is_kept() {
        let (engine, _) = fixtures::engine();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        let billing = engine
            .catalog
            .create(fixtures::new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let build = engine
            .builds
            .create(fixtures::new_build(billing.id, Some(r1.id), "1.0.0"))
            .await
            .unwrap();
        let env = engine
            .environments
            .create(fixtures::new_environment("E1", r1.id))
            .await
            .unwrap();

        let err = engine.releases.delete(r1.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(engine.releases.get(r1.id).await.is_ok());
        assert_eq!(engine.builds.get(build.id).await.unwrap().release_id, Some(r1.id));

        engine.environments.delete(env.id).await.unwrap();
        engine.releases.delete(r1.id).await.unwrap();
        let detached = engine.builds.get(build.id).await.unwrap();
        assert_eq!(detached.release_id, None);
        assert_eq!(detached.version, "1.0.0");
    }
}
