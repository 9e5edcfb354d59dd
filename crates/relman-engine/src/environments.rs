//! Environments and environment groups.

use std::sync::Arc;

use chrono::Utc;
use relman_core::Result;
use relman_core::environment::{
    self, Environment, EnvironmentGroup, EnvironmentGroupUpdate, EnvironmentRefs, EnvironmentUpdate,
    NewEnvironment, NewEnvironmentGroup,
};
use relman_core::id::{EnvironmentGroupId, EnvironmentId, ReleaseId};
use relman_core::store::{Store, StoreTx};
use serde::Serialize;
use tracing::info;

use crate::require;

/// A group together with the environments it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentGroupDetail {
    #[serde(flatten)]
    pub group: EnvironmentGroup,
    pub environments: Vec<Environment>,
}

#[derive(Clone)]
pub struct Environments {
    store: Arc<dyn Store>,
}

async fn lookup_refs(
    tx: &mut Box<dyn StoreTx>,
    release_id: ReleaseId,
    group_id: Option<EnvironmentGroupId>,
) -> Result<EnvironmentRefs> {
    let release_exists = tx.get_release(release_id).await?.is_some();
    let group_exists = match group_id {
        Some(group_id) => tx.get_group(group_id).await?.is_some(),
        None => true,
    };
    Ok(EnvironmentRefs {
        release_exists,
        group_exists,
    })
}

impl Environments {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewEnvironment) -> Result<Environment> {
        let mut tx = self.store.begin().await?;
        let refs = lookup_refs(&mut tx, input.release_id, input.group_id).await?;
        let environment = environment::validate_new(input, refs, Utc::now())?;
        tx.insert_environment(&environment).await?;
        tx.commit().await?;

        info!(
            environment_id = %environment.id,
            name = %environment.name,
            release_id = %environment.release_id,
            "Created environment"
        );
        Ok(environment)
    }

    pub async fn get(&self, id: EnvironmentId) -> Result<Environment> {
        let mut tx = self.store.begin().await?;
        require(tx.get_environment(id).await?, "environment", id)
    }

    pub async fn list(&self) -> Result<Vec<Environment>> {
        let mut tx = self.store.begin().await?;
        tx.list_environments().await
    }

    /// Changing the release does not re-resolve member versions; that is
    /// what a sync is for.
    pub async fn update(&self, id: EnvironmentId, update: EnvironmentUpdate) -> Result<Environment> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_environment(id).await?, "environment", id)?;
        let release_id = update.release_id.unwrap_or(current.release_id);
        let group_id = update.group_id.unwrap_or(current.group_id);
        let refs = lookup_refs(&mut tx, release_id, group_id).await?;

        let environment = environment::validate_update(&current, update, refs, Utc::now())?;
        tx.update_environment(&environment).await?;
        tx.commit().await?;

        info!(environment_id = %id, status = %environment.status, release_id = %environment.release_id, "Updated environment");
        Ok(environment)
    }

    /// Deletes the environment and all of its memberships.
    pub async fn delete(&self, id: EnvironmentId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_environment(id).await?, "environment", id)?;
        let removed = tx.clear_environment_systems(id).await?;
        tx.delete_environment(id).await?;
        tx.commit().await?;

        info!(environment_id = %id, name = %current.name, memberships = removed, "Deleted environment");
        Ok(())
    }

    pub async fn create_group(&self, input: NewEnvironmentGroup) -> Result<EnvironmentGroup> {
        let group = environment::validate_new_group(input, Utc::now())?;
        let mut tx = self.store.begin().await?;
        tx.insert_group(&group).await?;
        tx.commit().await?;

        info!(group_id = %group.id, name = %group.name, "Created environment group");
        Ok(group)
    }

    pub async fn get_group(&self, id: EnvironmentGroupId) -> Result<EnvironmentGroupDetail> {
        let mut tx = self.store.begin().await?;
        let group = require(tx.get_group(id).await?, "environment group", id)?;
        let environments = tx.list_environments_in_group(id).await?;
        Ok(EnvironmentGroupDetail { group, environments })
    }

    pub async fn list_groups(&self) -> Result<Vec<EnvironmentGroup>> {
        let mut tx = self.store.begin().await?;
        tx.list_groups().await
    }

    pub async fn update_group(
        &self,
        id: EnvironmentGroupId,
        update: EnvironmentGroupUpdate,
    ) -> Result<EnvironmentGroup> {
        let mut tx = self.store.begin().await?;
        let current = require(tx.get_group(id).await?, "environment group", id)?;
        let group = environment::validate_group_update(&current, update, Utc::now())?;
        tx.update_group(&group).await?;
        tx.commit().await?;

        info!(group_id = %id, name = %group.name, "Updated environment group");
        Ok(group)
    }

    pub async fn delete_group(&self, id: EnvironmentGroupId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let group = require(tx.get_group(id).await?, "environment group", id)?;
        let owned = tx.list_environments_in_group(id).await?.len() as u64;
        environment::ensure_group_deletable(&group, owned)?;

        tx.delete_group(id).await?;
        tx.commit().await?;

        info!(group_id = %id, name = %group.name, "Deleted environment group");
        Ok(())
    }
}
