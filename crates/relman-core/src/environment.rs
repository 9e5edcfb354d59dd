//! Environments and the groups that organise them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{EnvironmentGroupId, EnvironmentId, ReleaseId};
use crate::macros::required_text;
use crate::{Error, Result};

wire_enum! {
    pub enum EnvironmentType("environment type") {
        Dev = "dev",
        Staging = "staging",
        Prod = "prod",
    }
}

wire_enum! {
    pub enum EnvironmentStatus("environment status") {
        Active = "active",
        Decommissioned = "decommissioned",
        Maintenance = "maintenance",
        Pending = "pending",
    }
}

impl Default for EnvironmentStatus {
    fn default() -> Self {
        EnvironmentStatus::Pending
    }
}

/// A deployment target bound to one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: EnvironmentType,
    pub status: EnvironmentStatus,
    pub release_id: ReleaseId,
    #[serde(rename = "environment_group_id")]
    pub group_id: Option<EnvironmentGroupId>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEnvironment {
    pub name: String,
    pub environment_type: EnvironmentType,
    pub release_id: ReleaseId,
    pub status: Option<EnvironmentStatus>,
    pub group_id: Option<EnvironmentGroupId>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentUpdate {
    pub name: Option<String>,
    pub environment_type: Option<EnvironmentType>,
    pub release_id: Option<ReleaseId>,
    pub status: Option<EnvironmentStatus>,
    pub group_id: Option<Option<EnvironmentGroupId>>,
    pub url: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// Existence of the entities an environment references, looked up by the
/// caller before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentRefs {
    pub release_exists: bool,
    pub group_exists: bool,
}

fn ensure_refs(
    release_id: ReleaseId,
    group_id: Option<EnvironmentGroupId>,
    refs: EnvironmentRefs,
) -> Result<()> {
    if !refs.release_exists {
        return Err(Error::not_found("release", release_id));
    }
    match group_id {
        Some(group_id) if !refs.group_exists => Err(Error::not_found("environment group", group_id)),
        _ => Ok(()),
    }
}

pub fn validate_new(input: NewEnvironment, refs: EnvironmentRefs, now: DateTime<Utc>) -> Result<Environment> {
    let name = required_text("environment name", &input.name)?;
    ensure_refs(input.release_id, input.group_id, refs)?;

    Ok(Environment {
        id: EnvironmentId::new(),
        name,
        environment_type: input.environment_type,
        status: input.status.unwrap_or_default(),
        release_id: input.release_id,
        group_id: input.group_id,
        url: input.url,
        description: input.description,
        created_at: now,
        updated_at: now,
    })
}

pub fn validate_update(
    current: &Environment,
    update: EnvironmentUpdate,
    refs: EnvironmentRefs,
    now: DateTime<Utc>,
) -> Result<Environment> {
    let release_id = update.release_id.unwrap_or(current.release_id);
    let group_id = update.group_id.unwrap_or(current.group_id);
    ensure_refs(release_id, group_id, refs)?;

    let name = match update.name {
        Some(name) => required_text("environment name", &name)?,
        None => current.name.clone(),
    };

    Ok(Environment {
        id: current.id,
        name,
        environment_type: update.environment_type.unwrap_or(current.environment_type),
        status: update.status.unwrap_or(current.status),
        release_id,
        group_id,
        url: update.url.unwrap_or_else(|| current.url.clone()),
        description: update.description.unwrap_or_else(|| current.description.clone()),
        created_at: current.created_at,
        updated_at: now,
    })
}

/// A named collection of environments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentGroup {
    pub id: EnvironmentGroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEnvironmentGroup {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentGroupUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

pub fn validate_new_group(input: NewEnvironmentGroup, now: DateTime<Utc>) -> Result<EnvironmentGroup> {
    Ok(EnvironmentGroup {
        id: EnvironmentGroupId::new(),
        name: required_text("environment group name", &input.name)?,
        description: input.description,
        created_at: now,
        updated_at: now,
    })
}

pub fn validate_group_update(
    current: &EnvironmentGroup,
    update: EnvironmentGroupUpdate,
    now: DateTime<Utc>,
) -> Result<EnvironmentGroup> {
    let name = match update.name {
        Some(name) => required_text("environment group name", &name)?,
        None => current.name.clone(),
    };
    Ok(EnvironmentGroup {
        id: current.id,
        name,
        description: update.description.unwrap_or_else(|| current.description.clone()),
        created_at: current.created_at,
        updated_at: now,
    })
}

/// Groups may only be deleted once empty.
pub fn ensure_group_deletable(group: &EnvironmentGroup, environment_count: u64) -> Result<()> {
    if environment_count > 0 {
        return Err(Error::Validation(format!(
            "environment group {} still owns {} environment(s); reassign or delete them first",
            group.name, environment_count
        )));
    }
    Ok(())
}
