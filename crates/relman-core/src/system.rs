//! Catalog systems and the two-level hierarchy rules.
//!
//! Systems form an arena keyed by [`SystemId`]; a subsystem points at its
//! parent by id and nothing points back. Every rule about how a system may be
//! placed or retyped is evaluated here as a pure function over facts the
//! caller gathered from the store, so the engine's job is reduced to
//! "look up, validate, apply".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::SystemId;
use crate::macros::required_text;
use crate::{Error, Result};

wire_enum! {
    /// Position of a system in the hierarchy.
    pub enum SystemType("system type") {
        /// Groups subsystems; never carries builds itself.
        Parent = "parent_systems" | "parent",
        Standalone = "systems" | "standalone",
        Subsystem = "subsystems" | "subsystem",
    }
}

wire_enum! {
    pub enum SystemStatus("system status") {
        Active = "active",
        Deprecated = "deprecated",
    }
}

impl Default for SystemStatus {
    fn default() -> Self {
        SystemStatus::Active
    }
}

/// A deployable component of the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<SystemId>,
    #[serde(rename = "type")]
    pub system_type: SystemType,
    pub status: SystemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a system.
#[derive(Debug, Clone)]
pub struct NewSystem {
    pub name: String,
    pub system_type: SystemType,
    pub parent_id: Option<SystemId>,
    pub status: Option<SystemStatus>,
    pub description: Option<String>,
}

/// Partial update of a system. `None` leaves a field untouched; the nested
/// options on `parent_id` and `description` distinguish "clear" from "keep".
#[derive(Debug, Clone, Default)]
pub struct SystemUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub system_type: Option<SystemType>,
    pub parent_id: Option<Option<SystemId>>,
    pub status: Option<SystemStatus>,
}

/// A hierarchy rule a requested change would break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HierarchyRule {
    #[error("a subsystem must reference a parent system")]
    SubsystemNeedsParent,
    #[error("only subsystems may reference a parent system")]
    OnlySubsystemsHaveParents,
    #[error("the referenced parent must have type parent_systems")]
    ParentMustBeParentType,
    #[error("only a two-level hierarchy is allowed; the referenced parent is itself a subsystem")]
    ParentMustBeRoot,
    #[error("a system cannot be its own parent")]
    SelfParent,
    #[error("a parent system that owns subsystems cannot change type")]
    ParentWithSubsystemsLocked,
    #[error("a standalone system that owns builds cannot change type")]
    StandaloneWithBuildsLocked,
    #[error("a system that owns builds cannot become a parent system")]
    BuildsCannotMoveToParent,
    #[error("a system that owns subsystems cannot be moved under another system")]
    SubsystemOwnerCannotMove,
}

impl From<HierarchyRule> for Error {
    fn from(rule: HierarchyRule) -> Self {
        Error::Validation(rule.to_string())
    }
}

/// What is known about the parent a system would be placed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFacts {
    pub id: SystemId,
    pub system_type: SystemType,
    pub has_parent: bool,
}

impl From<&System> for ParentFacts {
    fn from(parent: &System) -> Self {
        Self {
            id: parent.id,
            system_type: parent.system_type,
            has_parent: parent.parent_id.is_some(),
        }
    }
}

/// The inputs of the type/placement state machine.
///
/// `current` is `None` when the system is being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTransition {
    pub system: Option<SystemId>,
    pub current: Option<SystemType>,
    pub requested: SystemType,
    pub parent: Option<ParentFacts>,
    pub subsystem_count: u64,
    pub build_count: u64,
}

impl TypeTransition {
    /// Evaluate the transition. Anything not explicitly allowed is rejected
    /// with the first rule it violates.
    pub fn evaluate(&self) -> std::result::Result<(), HierarchyRule> {
        use SystemType::*;

        if let Some(current) = self.current {
            match (current, self.requested) {
                (from, to) if from == to => {}
                (Parent, _) if self.subsystem_count > 0 => {
                    return Err(HierarchyRule::ParentWithSubsystemsLocked);
                }
                (Standalone, _) if self.build_count > 0 => {
                    return Err(HierarchyRule::StandaloneWithBuildsLocked);
                }
                (_, Parent) if self.build_count > 0 => {
                    return Err(HierarchyRule::BuildsCannotMoveToParent);
                }
                _ => {}
            }
        }

        match (self.requested, self.parent) {
            (Subsystem, None) => Err(HierarchyRule::SubsystemNeedsParent),
            (Parent | Standalone, Some(_)) => Err(HierarchyRule::OnlySubsystemsHaveParents),
            (Parent | Standalone, None) => Ok(()),
            (Subsystem, Some(parent)) => {
                if Some(parent.id) == self.system {
                    Err(HierarchyRule::SelfParent)
                } else if parent.system_type != Parent {
                    Err(HierarchyRule::ParentMustBeParentType)
                } else if parent.has_parent {
                    Err(HierarchyRule::ParentMustBeRoot)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Counts gathered from the store about the system being changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    pub subsystem_count: u64,
    pub build_count: u64,
}

/// The outcome of validating an update, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemChange {
    pub system: System,
    /// Set when a parent's status changed; every subsystem must follow.
    pub cascade_status: Option<SystemStatus>,
}

fn ensure_parent_loaded(requested: Option<SystemId>, parent: Option<&System>) -> Result<()> {
    match (requested, parent) {
        (Some(id), None) => Err(Error::not_found("parent system", id)),
        (Some(id), Some(p)) if p.id != id => Err(Error::Internal(format!(
            "parent lookup returned system {} for requested {}",
            p.id, id
        ))),
        _ => Ok(()),
    }
}

/// Validate a creation request. `parent` must be the stored system for
/// `input.parent_id` (or `None` when it does not exist / was not requested).
pub fn validate_new(input: NewSystem, parent: Option<&System>, now: DateTime<Utc>) -> Result<System> {
    let name = required_text("system name", &input.name)?;
    ensure_parent_loaded(input.parent_id, parent)?;

    TypeTransition {
        system: None,
        current: None,
        requested: input.system_type,
        parent: parent.map(ParentFacts::from),
        subsystem_count: 0,
        build_count: 0,
    }
    .evaluate()?;

    Ok(System {
        id: SystemId::new(),
        name,
        description: input.description,
        parent_id: input.parent_id,
        system_type: input.system_type,
        status: input.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    })
}

/// Validate an update against the stored system.
///
/// `parent` must be the stored system for the *effective* parent id (the
/// requested one, or the current one when unchanged).
pub fn validate_update(
    current: &System,
    update: SystemUpdate,
    parent: Option<&System>,
    ownership: Ownership,
    now: DateTime<Utc>,
) -> Result<SystemChange> {
    let effective_parent = update.parent_id.unwrap_or(current.parent_id);
    ensure_parent_loaded(effective_parent, parent)?;

    if effective_parent != current.parent_id
        && effective_parent.is_some()
        && ownership.subsystem_count > 0
    {
        return Err(HierarchyRule::SubsystemOwnerCannotMove.into());
    }

    let requested = update.system_type.unwrap_or(current.system_type);
    TypeTransition {
        system: Some(current.id),
        current: Some(current.system_type),
        requested,
        parent: parent.map(ParentFacts::from),
        subsystem_count: ownership.subsystem_count,
        build_count: ownership.build_count,
    }
    .evaluate()?;

    let name = match update.name {
        Some(name) => required_text("system name", &name)?,
        None => current.name.clone(),
    };
    let status = update.status.unwrap_or(current.status);
    let cascade_status =
        (current.system_type == SystemType::Parent && status != current.status).then_some(status);

    Ok(SystemChange {
        system: System {
            id: current.id,
            name,
            description: update.description.unwrap_or_else(|| current.description.clone()),
            parent_id: effective_parent,
            system_type: requested,
            status,
            created_at: current.created_at,
            updated_at: now,
        },
        cascade_status,
    })
}

/// Systems may only be deleted once they own no subsystems.
pub fn ensure_deletable(system: &System, subsystem_count: u64) -> Result<()> {
    if subsystem_count > 0 {
        return Err(Error::Validation(format!(
            "system {} still owns {} subsystem(s); delete or move them first",
            system.name, subsystem_count
        )));
    }
    Ok(())
}
