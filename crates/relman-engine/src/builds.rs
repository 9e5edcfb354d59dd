//! Build registry.
//!
//! At most one build per system per release. The read-check here gives the
//! caller a descriptive conflict; the store's own uniqueness rule catches the
//! race between two concurrent creates.

use std::sync::Arc;

use chrono::Utc;
use relman_core::Result;
use relman_core::build::{self, Build, BuildUpdate, NewBuild};
use relman_core::id::BuildId;
use relman_core::store::Store;
use tracing::info;

use crate::require;

#[derive(Clone)]
pub struct Builds {
    store: Arc<dyn Store>,
}

impl Builds {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewBuild) -> Result<Build> {
        let mut tx = self.store.begin().await?;
        let system = require(tx.get_system(input.system_id).await?, "system", input.system_id)?;
        let occupant = match input.release_id {
            Some(release_id) => {
                require(tx.get_release(release_id).await?, "release", release_id)?;
                tx.find_build(system.id, release_id).await?
            }
            None => None,
        };

        let build = build::validate_new(input, &system, occupant.as_ref(), Utc::now())?;
        tx.insert_build(&build).await?;
        tx.commit().await?;

        info!(
            build_id = %build.id,
            system_id = %build.system_id,
            release_id = ?build.release_id,
            version = %build.version,
            "Created build"
        );
        Ok(build)
    }

    pub async fn get(&self, id: BuildId) -> Result<Build> {
        let mut tx = self.store.begin().await?;
        require(tx.get_build(id).await?, "build", id)
    }

    pub async fn list(&self) -> Result<Vec<Build>> {
        let mut tx = self.store.begin().await?;
        tx.list_builds().await
    }

    pub async fn update(&self, id: BuildId, update: BuildUpdate) -> Result<Build> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_build(id).await?, "build", id)?;
        build::ensure_same_system(&current, &update)?;

        let occupant = match update.effective_release(current.release_id) {
            Some(release_id) if Some(release_id) != current.release_id => {
                require(tx.get_release(release_id).await?, "release", release_id)?;
                tx.find_build(current.system_id, release_id).await?
            }
            _ => None,
        };

        let build = build::validate_update(&current, update, occupant.as_ref(), Utc::now())?;
        tx.update_build(&build).await?;
        tx.commit().await?;

        info!(build_id = %id, release_id = ?build.release_id, version = %build.version, "Updated build");
        Ok(build)
    }

    /// Memberships pinned to this build's version are left as they are; a
    /// sync of the environment re-resolves them.
    pub async fn delete(&self, id: BuildId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_build(id).await?, "build", id)?;
        tx.delete_build(id).await?;
        tx.commit().await?;

        info!(build_id = %id, system_id = %current.system_id, version = %current.version, "Deleted build");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use relman_core::ErrorKind;
    use relman_core::build::BuildUpdate;
    use relman_core::id::SystemId;
    use relman_core::system::SystemType;

    use crate::fixtures::{self, new_build, new_system};

    #[tokio::test]
    async fn test_parent_systems_reject_builds() {
        let (engine, _) = fixtures::engine();
        let (parent, _, _) = fixtures::payments_group(&engine).await;

        let err = engine.builds.create(new_build(parent.id, None, "1.0.0")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let (engine, _) = fixtures::engine();
        let err = engine
            .builds
            .create(new_build(SystemId::new(), None, "1.0.0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let err = engine
            .builds
            .create(new_build(billing.id, Some(relman_core::id::ReleaseId::new()), "1.0.0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_moving_build_into_occupied_release_conflicts() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r1.id), "1.0.0")).await.unwrap();
        let loose = engine.builds.create(new_build(billing.id, None, "1.1.0")).await.unwrap();

        let err = engine
            .builds
            .update(
                loose.id,
                BuildUpdate {
                    release_id: Some(Some(r1.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renamed = engine
            .builds
            .update(
                loose.id,
                BuildUpdate {
                    system_id: Some(billing.id),
                    version: Some("1.1.1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.version, "1.1.1");
        assert_eq!(renamed.release_id, None);
    }

    #[tokio::test]
    async fn test_delete_build() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let build = engine.builds.create(new_build(billing.id, None, "1.0.0")).await.unwrap();

        engine.builds.delete(build.id).await.unwrap();
        assert!(engine.builds.list().await.unwrap().is_empty());
        assert_eq!(engine.builds.delete(build.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
