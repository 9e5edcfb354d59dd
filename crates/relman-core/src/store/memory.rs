//! In-memory store, used by tests and local development.
//!
//! A transaction holds the table lock for its whole lifetime and works on a
//! private copy of the tables; commit swaps the copy in. That gives the same
//! all-or-nothing behaviour as the PostgreSQL store. Uniqueness and
//! foreign-key rules of the SQL schema are mirrored so both stores fail the
//! same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{
    BuildRepo, EnvironmentGroupRepo, EnvironmentRepo, MembershipRepo, ReleaseRepo, Store, StoreTx,
    SystemRepo,
};
use crate::access::{Grants, PermissionStore};
use crate::build::Build;
use crate::environment::{Environment, EnvironmentGroup};
use crate::id::{BuildId, EnvironmentGroupId, EnvironmentId, ReleaseId, SystemId, UserId};
use crate::membership::EnvironmentSystem;
use crate::release::Release;
use crate::system::{System, SystemStatus};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct Tables {
    systems: BTreeMap<SystemId, System>,
    releases: BTreeMap<ReleaseId, Release>,
    builds: BTreeMap<BuildId, Build>,
    environments: BTreeMap<EnvironmentId, Environment>,
    groups: BTreeMap<EnvironmentGroupId, EnvironmentGroup>,
    members: Vec<EnvironmentSystem>,
}

const UNLIMITED: usize = usize::MAX;

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    member_inserts_left: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            member_inserts_left: Arc::new(AtomicUsize::new(UNLIMITED)),
        }
    }

    /// Let the next `n` environment-system inserts succeed and fail every one
    /// after that with an internal error, until [`clear_faults`](Self::clear_faults).
    pub fn fail_environment_system_inserts_after(&self, n: usize) {
        self.member_inserts_left.store(n, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.member_inserts_left.store(UNLIMITED, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = (*guard).clone();
        Ok(Box::new(MemoryTx {
            guard,
            work,
            member_inserts_left: self.member_inserts_left.clone(),
        }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    member_inserts_left: Arc<AtomicUsize>,
}

impl MemoryTx {
    fn take_member_insert(&self) -> Result<()> {
        let granted = self
            .member_inserts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            });
        granted
            .map(|_| ())
            .map_err(|_| Error::Internal("injected environment_systems insert failure".to_string()))
    }

    fn ensure_build_slot_free(&self, build: &Build) -> Result<()> {
        let Some(release_id) = build.release_id else {
            return Ok(());
        };
        let taken = self
            .work
            .builds
            .values()
            .any(|b| b.id != build.id && b.system_id == build.system_id && b.release_id == Some(release_id));
        if taken {
            return Err(Error::Conflict(format!(
                "duplicate build for system {} in release {}",
                build.system_id, release_id
            )));
        }
        Ok(())
    }

    fn ensure_build_refs(&self, build: &Build) -> Result<()> {
        if !self.work.systems.contains_key(&build.system_id) {
            return Err(Error::Conflict(format!("build references missing system {}", build.system_id)));
        }
        match build.release_id {
            Some(release_id) if !self.work.releases.contains_key(&release_id) => Err(Error::Conflict(
                format!("build references missing release {release_id}"),
            )),
            _ => Ok(()),
        }
    }

    fn ensure_environment_refs(&self, environment: &Environment) -> Result<()> {
        if !self.work.releases.contains_key(&environment.release_id) {
            return Err(Error::Conflict(format!(
                "environment references missing release {}",
                environment.release_id
            )));
        }
        match environment.group_id {
            Some(group_id) if !self.work.groups.contains_key(&group_id) => Err(Error::Conflict(format!(
                "environment references missing group {group_id}"
            ))),
            _ => Ok(()),
        }
    }
}

fn replace<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V, what: &str, id: impl std::fmt::Display) -> Result<()> {
    match table.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(Error::not_found(what, id)),
    }
}

fn insert<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V, what: &str, id: impl std::fmt::Display) -> Result<()> {
    if table.contains_key(&key) {
        return Err(Error::Conflict(format!("{what} {id} already exists")));
    }
    table.insert(key, value);
    Ok(())
}

fn sorted_by_name<T: Clone>(rows: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| name(a).cmp(name(b)));
    rows
}

fn sorted_by_build_date(rows: impl Iterator<Item = Build>) -> Vec<Build> {
    let mut rows: Vec<Build> = rows.collect();
    rows.sort_by(|a, b| a.build_date.cmp(&b.build_date).then(a.id.cmp(&b.id)));
    rows
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work, .. } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl SystemRepo for MemoryTx {
    async fn get_system(&mut self, id: SystemId) -> Result<Option<System>> {
        Ok(self.work.systems.get(&id).cloned())
    }

    async fn list_systems(&mut self) -> Result<Vec<System>> {
        Ok(sorted_by_name(self.work.systems.values().cloned(), |s| s.name.as_str()))
    }

    async fn list_subsystems(&mut self, parent: SystemId) -> Result<Vec<System>> {
        let children = self
            .work
            .systems
            .values()
            .filter(|s| s.parent_id == Some(parent))
            .cloned();
        Ok(sorted_by_name(children, |s| s.name.as_str()))
    }

    async fn count_subsystems(&mut self, parent: SystemId) -> Result<u64> {
        Ok(self.work.systems.values().filter(|s| s.parent_id == Some(parent)).count() as u64)
    }

    async fn insert_system(&mut self, system: &System) -> Result<()> {
        insert(&mut self.work.systems, system.id, system.clone(), "system", system.id)
    }

    async fn update_system(&mut self, system: &System) -> Result<()> {
        replace(&mut self.work.systems, system.id, system.clone(), "system", system.id)
    }

    async fn set_subsystem_status(
        &mut self,
        parent: SystemId,
        status: SystemStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut touched = 0;
        for child in self.work.systems.values_mut().filter(|s| s.parent_id == Some(parent)) {
            child.status = status;
            child.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_system(&mut self, id: SystemId) -> Result<bool> {
        if self.work.systems.values().any(|s| s.parent_id == Some(id)) {
            return Err(Error::Conflict(format!("system {id} is still referenced by subsystems")));
        }
        if self.work.systems.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.builds.retain(|_, b| b.system_id != id);
        self.work.members.retain(|m| m.system_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ReleaseRepo for MemoryTx {
    async fn get_release(&mut self, id: ReleaseId) -> Result<Option<Release>> {
        Ok(self.work.releases.get(&id).cloned())
    }

    async fn list_releases(&mut self) -> Result<Vec<Release>> {
        let mut releases: Vec<Release> = self.work.releases.values().cloned().collect();
        releases.sort_by(|a, b| b.release_date.cmp(&a.release_date).then(a.name.cmp(&b.name)));
        Ok(releases)
    }

    async fn insert_release(&mut self, release: &Release) -> Result<()> {
        insert(&mut self.work.releases, release.id, release.clone(), "release", release.id)
    }

    async fn update_release(&mut self, release: &Release) -> Result<()> {
        replace(&mut self.work.releases, release.id, release.clone(), "release", release.id)
    }

    async fn delete_release(&mut self, id: ReleaseId) -> Result<bool> {
        if self.work.environments.values().any(|e| e.release_id == id) {
            return Err(Error::Conflict(format!("release {id} is still referenced by environments")));
        }
        if self.work.releases.remove(&id).is_none() {
            return Ok(false);
        }
        for build in self.work.builds.values_mut().filter(|b| b.release_id == Some(id)) {
            build.release_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl BuildRepo for MemoryTx {
    async fn get_build(&mut self, id: BuildId) -> Result<Option<Build>> {
        Ok(self.work.builds.get(&id).cloned())
    }

    async fn list_builds(&mut self) -> Result<Vec<Build>> {
        Ok(sorted_by_build_date(self.work.builds.values().cloned()))
    }

    async fn list_builds_for_system(&mut self, system: SystemId) -> Result<Vec<Build>> {
        let builds = self.work.builds.values().filter(|b| b.system_id == system).cloned();
        Ok(sorted_by_build_date(builds))
    }

    async fn list_builds_for_release(&mut self, release: ReleaseId) -> Result<Vec<Build>> {
        let builds = self
            .work
            .builds
            .values()
            .filter(|b| b.release_id == Some(release))
            .cloned();
        Ok(sorted_by_build_date(builds))
    }

    async fn find_build(&mut self, system: SystemId, release: ReleaseId) -> Result<Option<Build>> {
        Ok(self
            .work
            .builds
            .values()
            .find(|b| b.system_id == system && b.release_id == Some(release))
            .cloned())
    }

    async fn count_builds_for_system(&mut self, system: SystemId) -> Result<u64> {
        Ok(self.work.builds.values().filter(|b| b.system_id == system).count() as u64)
    }

    async fn insert_build(&mut self, build: &Build) -> Result<()> {
        self.ensure_build_refs(build)?;
        self.ensure_build_slot_free(build)?;
        insert(&mut self.work.builds, build.id, build.clone(), "build", build.id)
    }

    async fn update_build(&mut self, build: &Build) -> Result<()> {
        self.ensure_build_refs(build)?;
        self.ensure_build_slot_free(build)?;
        replace(&mut self.work.builds, build.id, build.clone(), "build", build.id)
    }

    async fn delete_build(&mut self, id: BuildId) -> Result<bool> {
        Ok(self.work.builds.remove(&id).is_some())
    }
}

#[async_trait]
impl EnvironmentRepo for MemoryTx {
    async fn get_environment(&mut self, id: EnvironmentId) -> Result<Option<Environment>> {
        Ok(self.work.environments.get(&id).cloned())
    }

    async fn list_environments(&mut self) -> Result<Vec<Environment>> {
        Ok(sorted_by_name(self.work.environments.values().cloned(), |e| e.name.as_str()))
    }

    async fn list_environments_in_group(&mut self, group: EnvironmentGroupId) -> Result<Vec<Environment>> {
        let members = self
            .work
            .environments
            .values()
            .filter(|e| e.group_id == Some(group))
            .cloned();
        Ok(sorted_by_name(members, |e| e.name.as_str()))
    }

    async fn insert_environment(&mut self, environment: &Environment) -> Result<()> {
        self.ensure_environment_refs(environment)?;
        insert(
            &mut self.work.environments,
            environment.id,
            environment.clone(),
            "environment",
            environment.id,
        )
    }

    async fn update_environment(&mut self, environment: &Environment) -> Result<()> {
        self.ensure_environment_refs(environment)?;
        replace(
            &mut self.work.environments,
            environment.id,
            environment.clone(),
            "environment",
            environment.id,
        )
    }

    async fn delete_environment(&mut self, id: EnvironmentId) -> Result<bool> {
        if self.work.environments.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.members.retain(|m| m.environment_id != id);
        Ok(true)
    }
}

#[async_trait]
impl EnvironmentGroupRepo for MemoryTx {
    async fn get_group(&mut self, id: EnvironmentGroupId) -> Result<Option<EnvironmentGroup>> {
        Ok(self.work.groups.get(&id).cloned())
    }

    async fn list_groups(&mut self) -> Result<Vec<EnvironmentGroup>> {
        Ok(sorted_by_name(self.work.groups.values().cloned(), |g| g.name.as_str()))
    }

    async fn insert_group(&mut self, group: &EnvironmentGroup) -> Result<()> {
        insert(&mut self.work.groups, group.id, group.clone(), "environment group", group.id)
    }

    async fn update_group(&mut self, group: &EnvironmentGroup) -> Result<()> {
        replace(&mut self.work.groups, group.id, group.clone(), "environment group", group.id)
    }

    async fn delete_group(&mut self, id: EnvironmentGroupId) -> Result<bool> {
        if self.work.environments.values().any(|e| e.group_id == Some(id)) {
            return Err(Error::Conflict(format!(
                "environment group {id} is still referenced by environments"
            )));
        }
        Ok(self.work.groups.remove(&id).is_some())
    }
}

#[async_trait]
impl MembershipRepo for MemoryTx {
    async fn list_environment_systems(&mut self, environment: EnvironmentId) -> Result<Vec<EnvironmentSystem>> {
        Ok(self
            .work
            .members
            .iter()
            .filter(|m| m.environment_id == environment)
            .cloned()
            .collect())
    }

    async fn find_environment_system(
        &mut self,
        environment: EnvironmentId,
        system: SystemId,
    ) -> Result<Option<EnvironmentSystem>> {
        Ok(self
            .work
            .members
            .iter()
            .find(|m| m.environment_id == environment && m.system_id == system)
            .cloned())
    }

    async fn insert_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()> {
        self.take_member_insert()?;
        if !self.work.environments.contains_key(&member.environment_id)
            || !self.work.systems.contains_key(&member.system_id)
        {
            return Err(Error::Conflict(format!(
                "environment system references missing environment {} or system {}",
                member.environment_id, member.system_id
            )));
        }
        let duplicate = self
            .work
            .members
            .iter()
            .any(|m| m.environment_id == member.environment_id && m.system_id == member.system_id);
        if duplicate {
            return Err(Error::Conflict(format!(
                "system {} is already in environment {}",
                member.system_id, member.environment_id
            )));
        }
        self.work.members.push(member.clone());
        Ok(())
    }

    async fn update_environment_system(&mut self, member: &EnvironmentSystem) -> Result<()> {
        match self.work.members.iter_mut().find(|m| m.id == member.id) {
            Some(slot) => {
                *slot = member.clone();
                Ok(())
            }
            None => Err(Error::not_found("environment system", member.id)),
        }
    }

    async fn delete_environment_system(&mut self, environment: EnvironmentId, system: SystemId) -> Result<bool> {
        let before = self.work.members.len();
        self.work
            .members
            .retain(|m| !(m.environment_id == environment && m.system_id == system));
        Ok(self.work.members.len() != before)
    }

    async fn clear_environment_systems(&mut self, environment: EnvironmentId) -> Result<u64> {
        let before = self.work.members.len();
        self.work.members.retain(|m| m.environment_id != environment);
        Ok((before - self.work.members.len()) as u64)
    }
}

/// Grants held in memory, keyed by user.
#[derive(Clone, Default)]
pub struct MemoryPermissionStore {
    grants: Arc<RwLock<HashMap<UserId, Grants>>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, user: UserId, grants: Grants) {
        self.grants.write().await.insert(user, grants);
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn grants_for(&self, user: UserId) -> Result<Grants> {
        Ok(self.grants.read().await.get(&user).cloned().unwrap_or_default())
    }
}
