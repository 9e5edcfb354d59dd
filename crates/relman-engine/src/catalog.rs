//! Catalog hierarchy manager: systems and their two-level parent/subsystem tree.

use std::sync::Arc;

use chrono::Utc;
use relman_core::Result;
use relman_core::build::Build;
use relman_core::id::SystemId;
use relman_core::store::Store;
use relman_core::system::{self, NewSystem, Ownership, System, SystemUpdate};
use tracing::{debug, info};

use crate::require;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewSystem) -> Result<System> {
        let mut tx = self.store.begin().await?;
        let parent = match input.parent_id {
            Some(id) => tx.get_system(id).await?,
            None => None,
        };

        let system = system::validate_new(input, parent.as_ref(), Utc::now())?;
        tx.insert_system(&system).await?;
        tx.commit().await?;

        info!(
            system_id = %system.id,
            name = %system.name,
            system_type = %system.system_type,
            parent_id = ?system.parent_id,
            "Created system"
        );
        Ok(system)
    }

    pub async fn get(&self, id: SystemId) -> Result<System> {
        let mut tx = self.store.begin().await?;
        require(tx.get_system(id).await?, "system", id)
    }

    pub async fn list(&self) -> Result<Vec<System>> {
        let mut tx = self.store.begin().await?;
        tx.list_systems().await
    }

    /// Update a system. When a parent's status changes, every subsystem is
    /// forced to the same status in the same transaction.
    pub async fn update(&self, id: SystemId, update: SystemUpdate) -> Result<System> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_system(id).await?, "system", id)?;

        let parent = match update.parent_id.unwrap_or(current.parent_id) {
            Some(parent_id) => tx.get_system(parent_id).await?,
            None => None,
        };
        let ownership = Ownership {
            subsystem_count: tx.count_subsystems(id).await?,
            build_count: tx.count_builds_for_system(id).await?,
        };

        let change = system::validate_update(&current, update, parent.as_ref(), ownership, Utc::now())?;

        if let Some(status) = change.cascade_status {
            let touched = tx
                .set_subsystem_status(id, status, change.system.updated_at)
                .await?;
            info!(system_id = %id, %status, subsystems = touched, "Cascading status to subsystems");
        }
        tx.update_system(&change.system).await?;
        tx.commit().await?;

        info!(system_id = %id, system_type = %change.system.system_type, "Updated system");
        Ok(change.system)
    }

    pub async fn delete(&self, id: SystemId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_system(id).await?, "system", id)?;
        system::ensure_deletable(&current, tx.count_subsystems(id).await?)?;

        tx.delete_system(id).await?;
        tx.commit().await?;

        info!(system_id = %id, name = %current.name, "Deleted system");
        Ok(())
    }

    pub async fn list_subsystems(&self, parent: SystemId) -> Result<Vec<System>> {
        let mut tx = self.store.begin().await?;
        require(tx.get_system(parent).await?, "system", parent)?;
        let subsystems = tx.list_subsystems(parent).await?;
        debug!(system_id = %parent, count = subsystems.len(), "Listed subsystems");
        Ok(subsystems)
    }

    pub async fn list_builds(&self, id: SystemId) -> Result<Vec<Build>> {
        let mut tx = self.store.begin().await?;
        require(tx.get_system(id).await?, "system", id)?;
        tx.list_builds_for_system(id).await
    }
}
