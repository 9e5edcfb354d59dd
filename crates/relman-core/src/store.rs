//! Storage ports.
//!
//! Every engine operation opens one [`StoreTx`] through [`Store::begin`], runs
//! its reads and validations against it, then applies its writes and commits.
//! Dropping a transaction without committing discards every write made through
//! it.
//!
//! The per-entity repository traits are split out so an implementation can be
//! read one table at a time; `StoreTx` is simply all of them plus `commit`.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::build::Build;
use crate::environment::{Environment, EnvironmentGroup};
use crate::id::{BuildId, EnvironmentGroupId, EnvironmentId, ReleaseId, SystemId};
use crate::membership::EnvironmentSystem;
use crate::release::Release;
use crate::system::{System, SystemStatus};

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx:
    SystemRepo + ReleaseRepo + BuildRepo + EnvironmentRepo + EnvironmentGroupRepo + MembershipRepo + Send
{
    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait SystemRepo: Send {
    async fn get_system(&mut self, id: SystemId) -> Result<Option<System>>;
    /// All systems, ordered by name.
    async fn list_systems(&mut self) -> Result<Vec<System>>;
    /// Direct children of `parent`, ordered by name.
    async fn list_subsystems(&mut self, parent: SystemId) -> Result<Vec<System>>;
    async fn count_subsystems(&mut self, parent: SystemId) -> Result<u64>;
    async fn insert_system(&mut self, system: &System) -> Result<()>;
    async fn update_system(&mut self, system: &System) -> Result<()>;
    /// Force every child of `parent` to `status`; returns the rows touched.
    async fn set_subsystem_status(
        &mut self,
        parent: SystemId,
        status: SystemStatus,
        now: DateTime<Utc>,
    ) -> Result<u64>;
    /// Returns whether a row was removed.
    async fn delete_system(&mut self, id: SystemId) -> Result<bool>;
}

#[async_trait]
pub trait ReleaseRepo: Send {
    async fn get_release(&mut self, id: ReleaseId) -> Result<Option<Release>>;
    /// Newest release date first.
    async fn list_releases(&mut self) -> Result<Vec<Release>>;
    async fn insert_release(&mut self, release: &Release) -> Result<()>;
    async fn update_release(&mut self, release: &Release) -> Result<()>;
    async fn delete_release(&mut self, id: ReleaseId) -> Result<bool>;
}

#[async_trait]
pub trait BuildRepo: Send {
    async fn get_build(&mut self, id: BuildId) -> Result<Option<Build>>;
    /// All builds, oldest build date first. Same ordering for the filtered lists.
    async fn list_builds(&mut self) -> Result<Vec<Build>>;
    async fn list_builds_for_system(&mut self, system: SystemId) -> Result<Vec<Build>>;
    async fn list_builds_for_release(&mut self, release: ReleaseId) -> Result<Vec<Build>>;
    /// The build occupying `(system, release)`, if any.
    async fn find_build(&mut self, system: SystemId, release: ReleaseId) -> Result<Option<Build>>;
    async fn count_builds_for_system(&mut self, system: SystemId) -> Result<u64>;
    async fn insert_build(&mut self, build: &Build) -> Result<()>;
    async fn update_build(&mut self, build: &Build) -> Result<()>;
    async fn delete_build(&mut self, id: BuildId) -> Result<bool>;
}

#[async_trait]
pub trait EnvironmentRepo: Send {
    async fn get_environment(&mut self, id: EnvironmentId) -> Result<Option<Environment>>;
    /// Ordered by name.
    async fn list_environments(&mut self) -> Result<Vec<Environment>>;
    async fn list_environments_in_group(&mut self, group: EnvironmentGroupId) -> Result<Vec<Environment>>;
    async fn insert_environment(&mut self, environment: &Environment) -> Result<()>;
    async fn update_environment(&mut self, environment: &Environment) -> Result<()>;
    async fn delete_environment(&mut self, id: EnvironmentId) -> Result<bool>;
}

#[async_trait]
pub trait EnvironmentGroupRepo: Send {
    async fn get_group(&mut self, id: EnvironmentGroupId) -> Result<Option<EnvironmentGroup>>;
    async fn list_groups(&mut self) -> Result<Vec<EnvironmentGroup>>;
    async fn insert_group(&mut self, group: &EnvironmentGroup) -> Result<()>;
    async fn update_group(&mut self, group: &EnvironmentGroup) -> Result<()>;
    async fn delete_group(&mut self, id: EnvironmentGroupId) -> Result<bool>;
}

#[async_trait]
pub trait MembershipRepo: Send {
    /// Members of `environment`, in insertion order.
    async fn list_environment_systems(&mut self, environment: EnvironmentId) -> Result<Vec<EnvironmentSystem>>;
    async fn find_environment_system(
        &mut self,
        environment: EnvironmentId,
        system: SystemId,
    ) -> Result<Option<EnvironmentSystem>>;
    async fn insert_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()>;
    async fn update_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()>;
    async fn delete_environment_system(&mut self, environment: EnvironmentId, system: SystemId) -> Result<bool>;
    /// Remove every member of `environment`; returns the rows removed.
    async fn clear_environment_systems(&mut self, environment: EnvironmentId) -> Result<u64>;
}
