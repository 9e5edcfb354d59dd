//! Environment membership: which system version runs in which environment.
//!
//! Two lookups drive everything here:
//! - [`ReleaseBuilds`] resolves the version a system *should* run in an
//!   environment, from the builds of the environment's release;
//! - [`AvailableVersions`] lists every version ever built for a system and is
//!   what an explicitly requested version is checked against.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::build::Build;
use crate::id::{EnvironmentId, EnvironmentSystemId, SystemId};
use crate::system::{System, SystemType};
use crate::{Error, Result};

wire_enum! {
    pub enum MembershipStatus("environment system status") {
        Active = "active",
        Inactive = "inactive",
    }
}

impl Default for MembershipStatus {
    fn default() -> Self {
        MembershipStatus::Active
    }
}

/// One system deployed in one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSystem {
    pub id: EnvironmentSystemId,
    pub environment_id: EnvironmentId,
    pub system_id: SystemId,
    /// Empty when no build could be resolved.
    pub version: String,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact projection of a membership joined with its system's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub system_id: SystemId,
    pub system_name: String,
    pub status: MembershipStatus,
    pub version: String,
}

impl MemberSummary {
    pub fn new(member: &EnvironmentSystem, system_name: impl Into<String>) -> Self {
        Self {
            system_id: member.system_id,
            system_name: system_name.into(),
            status: member.status,
            version: member.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddSystem {
    pub system_id: SystemId,
    /// Explicit version; `None` or empty means "resolve from the release".
    pub version: Option<String>,
    pub status: Option<MembershipStatus>,
}

impl AddSystem {
    /// The explicitly requested version, if a non-empty one was given.
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MembershipUpdate {
    /// An empty version counts as not given.
    pub version: Option<String>,
    pub status: Option<MembershipStatus>,
}

/// Versions built in one release, keyed by system.
#[derive(Debug, Clone, Default)]
pub struct ReleaseBuilds {
    by_system: HashMap<SystemId, String>,
}

impl ReleaseBuilds {
    pub fn new(builds: &[Build]) -> Self {
        let mut by_system = HashMap::with_capacity(builds.len());
        for build in builds {
            // (system, release) is unique; keep the first should the store disagree.
            by_system
                .entry(build.system_id)
                .or_insert_with(|| build.version.clone());
        }
        Self { by_system }
    }

    /// The version the release carries for `system`, or empty.
    pub fn resolve(&self, system: SystemId) -> String {
        self.by_system.get(&system).cloned().unwrap_or_default()
    }
}

/// Every distinct version built for one system, oldest build first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableVersions {
    system_name: String,
    versions: Vec<String>,
}

impl AvailableVersions {
    pub fn new(system: &System, builds: &[Build]) -> Self {
        let mut versions: Vec<String> = Vec::with_capacity(builds.len());
        for build in builds.iter().filter(|b| b.system_id == system.id) {
            if !versions.contains(&build.version) {
                versions.push(build.version.clone());
            }
        }
        Self {
            system_name: system.name.clone(),
            versions,
        }
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn into_versions(self) -> Vec<String> {
        self.versions
    }

    /// Empty versions are always acceptable; anything else must have been built.
    pub fn check(&self, version: &str) -> Result<()> {
        if version.is_empty() || self.versions.iter().any(|v| v == version) {
            return Ok(());
        }
        Err(Error::VersionNotFound {
            system: self.system_name.clone(),
            version: version.to_string(),
            available: self.versions.clone(),
        })
    }
}

/// The systems an add request actually targets: a parent expands to its
/// subsystems, anything else targets itself.
pub fn expand_targets(target: System, subsystems: Vec<System>) -> Vec<System> {
    if target.system_type == SystemType::Parent {
        subsystems
    } else {
        vec![target]
    }
}

/// Build the membership row for one target of an add request.
///
/// `available` is required when the request names an explicit version.
pub fn plan_member(
    environment_id: EnvironmentId,
    system: &System,
    request: &AddSystem,
    release_builds: &ReleaseBuilds,
    available: Option<&AvailableVersions>,
    now: DateTime<Utc>,
) -> Result<EnvironmentSystem> {
    let version = match request.requested_version() {
        None => release_builds.resolve(system.id),
        Some(version) => {
            let available = available.ok_or_else(|| {
                Error::Internal(format!("available versions of system {} were not loaded", system.id))
            })?;
            available.check(version)?;
            version.to_string()
        }
    };

    Ok(EnvironmentSystem {
        id: EnvironmentSystemId::new(),
        environment_id,
        system_id: system.id,
        version,
        status: request.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    })
}

/// Apply an update to a membership row.
pub fn apply_update(
    current: &EnvironmentSystem,
    update: MembershipUpdate,
    available: &AvailableVersions,
    now: DateTime<Utc>,
) -> Result<EnvironmentSystem> {
    let version = match update.version.filter(|v| !v.is_empty()) {
        Some(version) => {
            available.check(&version)?;
            version
        }
        None => current.version.clone(),
    };

    Ok(EnvironmentSystem {
        version,
        status: update.status.unwrap_or(current.status),
        updated_at: now,
        ..current.clone()
    })
}

/// Re-resolve a member against its environment's release. Returns the
/// changed row, or `None` when it is already in step.
pub fn resync(
    member: &EnvironmentSystem,
    release_builds: &ReleaseBuilds,
    now: DateTime<Utc>,
) -> Option<EnvironmentSystem> {
    let resolved = release_builds.resolve(member.system_id);
    (resolved != member.version).then(|| EnvironmentSystem {
        version: resolved,
        updated_at: now,
        ..member.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::id::{BuildId, ReleaseId};
    use crate::system::SystemStatus;

    fn system(name: &str, system_type: SystemType) -> System {
        let now = Utc::now();
        System {
            id: SystemId::new(),
            name: name.to_string(),
            description: None,
            parent_id: None,
            system_type,
            status: SystemStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn build(system: &System, release_id: Option<ReleaseId>, version: &str) -> Build {
        let now = Utc::now();
        Build {
            id: BuildId::new(),
            system_id: system.id,
            release_id,
            version: version.to_string(),
            build_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolution_uses_release_builds() {
        let gateway = system("Gateway", SystemType::Subsystem);
        let ledger = system("Ledger", SystemType::Subsystem);
        let r1 = ReleaseId::new();
        let builds = ReleaseBuilds::new(&[build(&gateway, Some(r1), "1.2.0")]);

        assert_eq!(builds.resolve(gateway.id), "1.2.0");
        assert_eq!(builds.resolve(ledger.id), "");
    }

    #[test]
    fn test_explicit_version_checked_across_all_releases() {
        let gateway = system("Gateway", SystemType::Standalone);
        let all = vec![
            build(&gateway, Some(ReleaseId::new()), "1.0.0"),
            build(&gateway, None, "1.1.0"),
            build(&gateway, Some(ReleaseId::new()), "1.1.0"),
        ];
        let available = AvailableVersions::new(&gateway, &all);
        assert_eq!(available.versions(), ["1.0.0", "1.1.0"]);

        let request = AddSystem {
            system_id: gateway.id,
            version: Some("1.0.0".to_string()),
            status: None,
        };
        let member = plan_member(
            EnvironmentId::new(),
            &gateway,
            &request,
            &ReleaseBuilds::default(),
            Some(&available),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(member.version, "1.0.0");
        assert_eq!(member.status, MembershipStatus::Active);
    }

    #[test]
    fn test_unknown_version_lists_alternatives() {
        let gateway = system("Gateway", SystemType::Standalone);
        let available = AvailableVersions::new(&gateway, &[build(&gateway, None, "1.0.0")]);
        let request = AddSystem {
            system_id: gateway.id,
            version: Some("2.0.0".to_string()),
            status: Some(MembershipStatus::Inactive),
        };

        let err = plan_member(
            EnvironmentId::new(),
            &gateway,
            &request,
            &ReleaseBuilds::default(),
            Some(&available),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.available_versions(), Some(&["1.0.0".to_string()][..]));
    }

    #[test]
    fn test_empty_explicit_version_falls_back_to_resolution() {
        let gateway = system("Gateway", SystemType::Standalone);
        let r1 = ReleaseId::new();
        let release_builds = ReleaseBuilds::new(&[build(&gateway, Some(r1), "3.0.0")]);
        let request = AddSystem {
            system_id: gateway.id,
            version: Some(String::new()),
            status: None,
        };
        let member = plan_member(EnvironmentId::new(), &gateway, &request, &release_builds, None, Utc::now())
            .unwrap();
        assert_eq!(member.version, "3.0.0");
    }

    #[test]
    fn test_parent_expands_to_subsystems() {
        let parent = system("PaymentsGroup", SystemType::Parent);
        let subs = vec![
            system("Gateway", SystemType::Subsystem),
            system("Ledger", SystemType::Subsystem),
        ];
        let targets = expand_targets(parent, subs.clone());
        assert_eq!(targets, subs);

        let standalone = system("Billing", SystemType::Standalone);
        assert_eq!(expand_targets(standalone.clone(), vec![]), vec![standalone]);
    }

    #[test]
    fn test_update_validates_versions_and_ignores_empty_ones() {
        let gateway = system("Gateway", SystemType::Standalone);
        let available = AvailableVersions::new(&gateway, &[build(&gateway, None, "1.0.0")]);
        let member = plan_member(
            EnvironmentId::new(),
            &gateway,
            &AddSystem {
                system_id: gateway.id,
                ..Default::default()
            },
            &ReleaseBuilds::default(),
            None,
            Utc::now(),
        )
        .unwrap();

        let bad = MembershipUpdate {
            version: Some("9.9.9".to_string()),
            status: None,
        };
        assert!(apply_update(&member, bad, &available, Utc::now()).is_err());

        let good = MembershipUpdate {
            version: Some("1.0.0".to_string()),
            status: Some(MembershipStatus::Inactive),
        };
        let updated = apply_update(&member, good, &available, Utc::now()).unwrap();
        assert_eq!(updated.version, "1.0.0");
        assert_eq!(updated.status, MembershipStatus::Inactive);

        let kept = apply_update(
            &updated,
            MembershipUpdate {
                version: Some(String::new()),
                status: None,
            },
            &available,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(kept.version, "1.0.0");
        assert_eq!(kept.status, MembershipStatus::Inactive);
    }

    #[test]
    fn test_resync_reports_only_drift() {
        let gateway = system("Gateway", SystemType::Standalone);
        let r1 = ReleaseId::new();
        let release_builds = ReleaseBuilds::new(&[build(&gateway, Some(r1), "1.4.0")]);
        let member = plan_member(
            EnvironmentId::new(),
            &gateway,
            &AddSystem {
                system_id: gateway.id,
                ..Default::default()
            },
            &ReleaseBuilds::default(),
            None,
            Utc::now(),
        )
        .unwrap();

        let changed = resync(&member, &release_builds, Utc::now()).unwrap();
        assert_eq!(changed.version, "1.4.0");
        assert!(resync(&changed, &release_builds, Utc::now()).is_none());
    }
}
