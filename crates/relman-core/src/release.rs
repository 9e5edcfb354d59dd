//! Releases: named, dated groupings of builds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::id::ReleaseId;
use crate::macros::required_text;

wire_enum! {
    pub enum ReleaseStatus("release status") {
        Planned = "planned",
        InProgress = "in-progress",
        Completed = "completed",
    }
}

impl Default for ReleaseStatus {
    fn default() -> Self {
        ReleaseStatus::Planned
    }
}

wire_enum! {
    pub enum ReleaseType("release type") {
        Major = "Major",
        Minor = "Minor",
        Hotfix = "Hotfix",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub name: String,
    pub description: Option<String>,
    pub release_date: DateTime<Utc>,
    pub status: ReleaseStatus,
    #[serde(rename = "type")]
    pub release_type: ReleaseType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRelease {
    pub name: String,
    pub description: Option<String>,
    pub release_date: DateTime<Utc>,
    pub status: Option<ReleaseStatus>,
    pub release_type: ReleaseType,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub release_date: Option<DateTime<Utc>>,
    pub status: Option<ReleaseStatus>,
    pub release_type: Option<ReleaseType>,
}

pub fn validate_new(input: NewRelease, now: DateTime<Utc>) -> Result<Release> {
    Ok(Release {
        id: ReleaseId::new(),
        name: required_text("release name", &input.name)?,
        description: input.description,
        release_date: input.release_date,
        status: input.status.unwrap_or_default(),
        release_type: input.release_type,
        created_at: now,
        updated_at: now,
    })
}

pub fn validate_update(current: &Release, update: ReleaseUpdate, now: DateTime<Utc>) -> Result<Release> {
    let name = match update.name {
        Some(name) => required_text("release name", &name)?,
        None => current.name.clone(),
    };
    Ok(Release {
        id: current.id,
        name,
        description: update.description.unwrap_or_else(|| current.description.clone()),
        release_date: update.release_date.unwrap_or(current.release_date),
        status: update.status.unwrap_or(current.status),
        release_type: update.release_type.unwrap_or(current.release_type),
        created_at: current.created_at,
        updated_at: now,
    })
}
