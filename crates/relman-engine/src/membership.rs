//! Environment membership engine.
//!
//! Membership rows are only ever written here, so every version stored on
//! one has been resolved from the environment's release or checked against
//! the system's builds.

use std::sync::Arc;

use chrono::Utc;
use relman_core::id::{EnvironmentId, SystemId};
use relman_core::membership::{
    self, AddSystem, AvailableVersions, EnvironmentSystem, MemberSummary, MembershipUpdate,
    ReleaseBuilds,
};
use relman_core::store::{Store, StoreTx};
use relman_core::system::System;
use relman_core::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::require;

/// Result of adding a system (or a parent's subsystems) to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedSystems {
    pub message: String,
    pub systems: Vec<MemberSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSystemsListing {
    pub environment_id: EnvironmentId,
    pub environment_name: String,
    pub systems: Vec<MemberSummary>,
}

/// One member plus every version its system could run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSystemDetail {
    pub system: MemberSummary,
    pub available_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub message: String,
    pub updated_count: u64,
}

#[derive(Clone)]
pub struct Membership {
    store: Arc<dyn Store>,
}

async fn find_member(
    tx: &mut Box<dyn StoreTx>,
    environment: EnvironmentId,
    system: SystemId,
) -> Result<EnvironmentSystem> {
    tx.find_environment_system(environment, system)
        .await?
        .ok_or_else(|| Error::NotFound(format!("system {system} is not in environment {environment}")))
}

async fn available_versions(tx: &mut Box<dyn StoreTx>, system: &System) -> Result<AvailableVersions> {
    let builds = tx.list_builds_for_system(system.id).await?;
    Ok(AvailableVersions::new(system, &builds))
}

impl Membership {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add a system to an environment. A parent system adds all of its
    /// subsystems instead. Systems already present are skipped; the remaining
    /// rows are inserted together or not at all.
    pub async fn add(&self, environment_id: EnvironmentId, request: AddSystem) -> Result<AddedSystems> {
        let mut tx = self.store.begin().await?;
        let environment = require(tx.get_environment(environment_id).await?, "environment", environment_id)?;
        let target = require(tx.get_system(request.system_id).await?, "system", request.system_id)?;

        let subsystems = tx.list_subsystems(target.id).await?;
        let targets = membership::expand_targets(target, subsystems);
        let release_builds = ReleaseBuilds::new(&tx.list_builds_for_release(environment.release_id).await?);
        let now = Utc::now();

        let mut planned = Vec::with_capacity(targets.len());
        for system in &targets {
            if tx.find_environment_system(environment.id, system.id).await?.is_some() {
                debug!(environment_id = %environment.id, system_id = %system.id, "System already in environment, skipping");
                continue;
            }
            let available = match request.requested_version() {
                Some(_) => Some(available_versions(&mut tx, system).await?),
                None => None,
            };
            let member = membership::plan_member(
                environment.id,
                system,
                &request,
                &release_builds,
                available.as_ref(),
                now,
            )?;
            planned.push((member, system.name.clone()));
        }

        for (member, _) in &planned {
            tx.insert_environment_system(member).await?;
        }
        tx.commit().await?;

        info!(
            environment_id = %environment.id,
            system_id = %request.system_id,
            added = planned.len(),
            "Added systems to environment"
        );
        Ok(AddedSystems {
            message: format!("Added {} system(s) to environment", planned.len()),
            systems: planned
                .iter()
                .map(|(member, name)| MemberSummary::new(member, name.as_str()))
                .collect(),
        })
    }

    pub async fn update(
        &self,
        environment_id: EnvironmentId,
        system_id: SystemId,
        update: MembershipUpdate,
    ) -> Result<MemberSummary> {
        let mut tx = self.store.begin().await?;
        require(tx.get_environment(environment_id).await?, "environment", environment_id)?;
        let current = find_member(&mut tx, environment_id, system_id).await?;
        let system = require(tx.get_system(system_id).await?, "system", system_id)?;
        let available = available_versions(&mut tx, &system).await?;

        let member = membership::apply_update(&current, update, &available, Utc::now())?;
        tx.update_environment_system(&member).await?;
        tx.commit().await?;

        info!(
            environment_id = %environment_id,
            system_id = %system_id,
            version = %member.version,
            status = %member.status,
            "Updated environment system"
        );
        Ok(MemberSummary::new(&member, system.name))
    }

    pub async fn remove(&self, environment_id: EnvironmentId, system_id: SystemId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_environment_system(environment_id, system_id).await? {
            return Err(Error::NotFound(format!(
                "system {system_id} is not in environment {environment_id}"
            )));
        }
        tx.commit().await?;

        info!(environment_id = %environment_id, system_id = %system_id, "Removed system from environment");
        Ok(())
    }

    /// Re-resolve every member against the environment's current release,
    /// writing only the rows whose version changed.
    pub async fn sync(&self, environment_id: EnvironmentId) -> Result<SyncReport> {
        let mut tx = self.store.begin().await?;
        let environment = require(tx.get_environment(environment_id).await?, "environment", environment_id)?;
        let release_builds = ReleaseBuilds::new(&tx.list_builds_for_release(environment.release_id).await?);
        let now = Utc::now();

        let mut updated_count = 0;
        for member in tx.list_environment_systems(environment_id).await? {
            let Some(changed) = membership::resync(&member, &release_builds, now) else {
                continue;
            };
            debug!(
                environment_id = %environment_id,
                system_id = %member.system_id,
                from = %member.version,
                to = %changed.version,
                "Version drifted"
            );
            tx.update_environment_system(&changed).await?;
            updated_count += 1;
        }
        tx.commit().await?;

        info!(environment_id = %environment_id, updated_count, "Synced environment system versions");
        Ok(SyncReport {
            message: format!("Updated {updated_count} system version(s)"),
            updated_count,
        })
    }

    pub async fn list(&self, environment_id: EnvironmentId) -> Result<EnvironmentSystemsListing> {
        let mut tx = self.store.begin().await?;
        let environment = require(tx.get_environment(environment_id).await?, "environment", environment_id)?;

        let members = tx.list_environment_systems(environment_id).await?;
        let mut systems = Vec::with_capacity(members.len());
        for member in &members {
            let system = require(tx.get_system(member.system_id).await?, "system", member.system_id)?;
            systems.push(MemberSummary::new(member, system.name));
        }

        Ok(EnvironmentSystemsListing {
            environment_id,
            environment_name: environment.name,
            systems,
        })
    }

    pub async fn get(&self, environment_id: EnvironmentId, system_id: SystemId) -> Result<EnvironmentSystemDetail> {
        let mut tx = self.store.begin().await?;
        require(tx.get_environment(environment_id).await?, "environment", environment_id)?;
        let member = find_member(&mut tx, environment_id, system_id).await?;
        let system = require(tx.get_system(system_id).await?, "system", system_id)?;
        let available = available_versions(&mut tx, &system).await?;

        Ok(EnvironmentSystemDetail {
            system: MemberSummary::new(&member, system.name),
            available_versions: available.into_versions(),
        })
    }
}

#[cfg(test)]
mod tests {
    use relman_core::ErrorKind;
    use relman_core::membership::{AddSystem, MembershipStatus, MembershipUpdate};
    use relman_core::system::SystemType;

    use crate::fixtures::{self, new_build, new_environment, new_system};

    #[tokio::test]
    async fn test_add_standalone_resolves_release_version() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r1.id), "4.2.0")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();

        let added = engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();
        assert_eq!(added.message, "Added 1 system(s) to environment");
        assert_eq!(added.systems[0].version, "4.2.0");
        assert_eq!(added.systems[0].status, MembershipStatus::Active);

        let again = engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();
        assert_eq!(again.message, "Added 0 system(s) to environment");
    }

    #[tokio::test]
    async fn test_add_without_release_build_leaves_version_empty() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();

        let added = engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();
        assert_eq!(added.systems[0].version, "");
    }

    #[tokio::test]
    async fn test_explicit_version_must_exist() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        engine.builds.create(new_build(billing.id, None, "0.9.0")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();

        let err = engine
            .membership
            .add(
                env.id,
                AddSystem {
                    system_id: billing.id,
                    version: Some("1.0.0".to_string()),
                    status: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.available_versions(), Some(&["0.9.0".to_string()][..]));

        let added = engine
            .membership
            .add(
                env.id,
                AddSystem {
                    system_id: billing.id,
                    version: Some("0.9.0".to_string()),
                    status: Some(MembershipStatus::Inactive),
                },
            )
            .await
            .unwrap();
        assert_eq!(added.systems[0].version, "0.9.0");
        assert_eq!(added.systems[0].status, MembershipStatus::Inactive);
    }

    #[tokio::test]
    async fn test_update_get_and_remove() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r1.id), "1.0.0")).await.unwrap();
        engine.builds.create(new_build(billing.id, None, "1.1.0-rc1")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();
        engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();

        let err = engine
            .membership
            .update(
                env.id,
                billing.id,
                MembershipUpdate {
                    version: Some("2.0.0".to_string()),
                    status: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let updated = engine
            .membership
            .update(
                env.id,
                billing.id,
                MembershipUpdate {
                    version: Some("1.1.0-rc1".to_string()),
                    status: Some(MembershipStatus::Inactive),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, "1.1.0-rc1");

        let detail = engine.membership.get(env.id, billing.id).await.unwrap();
        assert_eq!(detail.system, updated);
        assert_eq!(detail.available_versions, vec!["1.0.0", "1.1.0-rc1"]);

        engine.membership.remove(env.id, billing.id).await.unwrap();
        let err = engine.membership.remove(env.id, billing.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(engine.membership.list(env.id).await.unwrap().systems.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_empty_version_keeps_stored_version() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r1.id), "1.0.0")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();
        engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();

        let updated = engine
            .membership
            .update(
                env.id,
                billing.id,
                MembershipUpdate {
                    version: Some(String::new()),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_sync_after_release_change() {
        let (engine, _) = fixtures::engine();
        let billing = engine
            .catalog
            .create(new_system("Billing", SystemType::Standalone, None))
            .await
            .unwrap();
        let r1 = engine.releases.create(fixtures::new_release("R1")).await.unwrap();
        let r2 = engine.releases.create(fixtures::new_release("R2")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r1.id), "1.0.0")).await.unwrap();
        engine.builds.create(new_build(billing.id, Some(r2.id), "2.0.0")).await.unwrap();
        let env = engine.environments.create(new_environment("E1", r1.id)).await.unwrap();
        engine.membership.add(env.id, fixtures::add_system(billing.id)).await.unwrap();

        engine
            .environments
            .update(
                env.id,
                relman_core::environment::EnvironmentUpdate {
                    release_id: Some(r2.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = engine.membership.sync(env.id).await.unwrap();
        assert_eq!(report.updated_count, 1);
        let listing = engine.membership.list(env.id).await.unwrap();
        assert_eq!(listing.environment_name, "E1");
        assert_eq!(listing.systems[0].version, "2.0.0");
    }
}
