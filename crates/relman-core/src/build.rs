//! Builds: versioned artifacts of one system, optionally tied to a release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{BuildId, ReleaseId, SystemId};
use crate::macros::required_text;
use crate::system::{System, SystemType};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub system_id: SystemId,
    pub release_id: Option<ReleaseId>,
    pub version: String,
    pub build_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBuild {
    pub system_id: SystemId,
    pub release_id: Option<ReleaseId>,
    pub version: String,
    pub build_date: DateTime<Utc>,
}

/// Partial update of a build. `system_id` is accepted only so an unchanged
/// value can round-trip; any other value is rejected.
#[derive(Debug, Clone, Default)]
pub struct BuildUpdate {
    pub system_id: Option<SystemId>,
    pub release_id: Option<Option<ReleaseId>>,
    pub version: Option<String>,
    pub build_date: Option<DateTime<Utc>>,
}

impl BuildUpdate {
    /// The release the build ends up in, given its current release.
    pub fn effective_release(&self, current: Option<ReleaseId>) -> Option<ReleaseId> {
        self.release_id.unwrap_or(current)
    }
}

/// Builds belong to leaf systems only.
pub fn ensure_buildable(system: &System) -> Result<()> {
    if system.system_type == SystemType::Parent {
        return Err(Error::Validation(format!(
            "system {} is a parent system; builds belong to its subsystems",
            system.name
        )));
    }
    Ok(())
}

fn ensure_free_slot(
    system_id: SystemId,
    release_id: Option<ReleaseId>,
    occupant: Option<&Build>,
    own_id: Option<BuildId>,
) -> Result<()> {
    match (release_id, occupant) {
        (Some(release_id), Some(existing)) if Some(existing.id) != own_id => {
            Err(Error::Conflict(format!(
                "system {} already has build {} (version {}) in release {}",
                system_id, existing.id, existing.version, release_id
            )))
        }
        _ => Ok(()),
    }
}

/// Validate a new build.
///
/// `occupant` is the existing build for `(system, release)` if any; the store
/// lookup is only meaningful when a release was requested.
pub fn validate_new(
    input: NewBuild,
    system: &System,
    occupant: Option<&Build>,
    now: DateTime<Utc>,
) -> Result<Build> {
    ensure_buildable(system)?;
    let version = required_text("build version", &input.version)?;
    ensure_free_slot(system.id, input.release_id, occupant, None)?;

    Ok(Build {
        id: BuildId::new(),
        system_id: system.id,
        release_id: input.release_id,
        version,
        build_date: input.build_date,
        created_at: now,
        updated_at: now,
    })
}

/// Rejects any attempt to move a build to another system.
pub fn ensure_same_system(current: &Build, update: &BuildUpdate) -> Result<()> {
    match update.system_id {
        Some(requested) if requested != current.system_id => Err(Error::Validation(format!(
            "system_id of build {} is immutable (stored {}, requested {})",
            current.id, current.system_id, requested
        ))),
        _ => Ok(()),
    }
}

/// Validate an update; `occupant` is the build currently holding the
/// effective `(system, release)` slot.
pub fn validate_update(
    current: &Build,
    update: BuildUpdate,
    occupant: Option<&Build>,
    now: DateTime<Utc>,
) -> Result<Build> {
    ensure_same_system(current, &update)?;
    let release_id = update.effective_release(current.release_id);
    if release_id != current.release_id {
        ensure_free_slot(current.system_id, release_id, occupant, Some(current.id))?;
    }

    let version = match update.version {
        Some(version) => required_text("build version", &version)?,
        None => current.version.clone(),
    };

    Ok(Build {
        id: current.id,
        system_id: current.system_id,
        release_id,
        version,
        build_date: update.build_date.unwrap_or(current.build_date),
        created_at: current.created_at,
        updated_at: now,
    })
}
