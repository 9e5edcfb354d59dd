//! Permission patterns and the evaluator every operation is gated by.
//!
//! A granted pattern is `*`, an exact permission string, or a
//! `resource:action` pair where either half may be `*`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::{Error, Result};

/// Whether `pattern` grants `requested`.
pub fn matches(pattern: &str, requested: &str) -> bool {
    if pattern == "*" || pattern == requested {
        return true;
    }
    match (pair(pattern), pair(requested)) {
        (Some((p_resource, p_action)), Some((r_resource, r_action))) => {
            half_matches(p_resource, r_resource) && half_matches(p_action, r_action)
        }
        _ => false,
    }
}

/// Splits `resource:action`; anything other than exactly two parts is not a pair.
fn pair(s: &str) -> Option<(&str, &str)> {
    let (resource, action) = s.split_once(':')?;
    (!action.contains(':')).then_some((resource, action))
}

fn half_matches(pattern: &str, requested: &str) -> bool {
    pattern == "*" || pattern == requested
}

wire_enum! {
    pub enum Resource("resource") {
        System = "system",
        Release = "release",
        Build = "build",
        Environment = "environment",
        EnvironmentGroup = "environment-group",
        EnvironmentSystem = "environment-system",
    }
}

wire_enum! {
    pub enum Action("action") {
        Read = "read",
        Create = "create",
        Update = "update",
        Delete = "delete",
    }
}

/// A requested `resource:action` permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{resource}:{action}")]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

/// Everything a caller has been granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    pub is_admin: bool,
    pub patterns: Vec<String>,
}

impl Grants {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_admin: false,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, permission: &Permission) -> bool {
        if self.is_admin {
            return true;
        }
        let requested = permission.to_string();
        self.patterns.iter().any(|p| matches(p, &requested))
    }

    pub fn authorize(&self, permission: &Permission) -> Result<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("missing permission {permission}")))
        }
    }
}

/// Source of a caller's grants. Unknown users have none.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn grants_for(&self, user: UserId) -> Result<Grants>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_star_matches_everything() {
        assert!(matches("*", "release:read"));
        assert!(matches("*", "anything"));
    }

    #[test]
    fn test_resource_wildcard() {
        assert!(matches("release:*", "release:read"));
        assert!(matches("release:*", "release:delete"));
        assert!(!matches("release:*", "build:read"));
    }

    #[test]
    fn test_action_wildcard_and_exact() {
        assert!(matches("*:read", "environment-system:read"));
        assert!(!matches("*:read", "environment-system:update"));
        assert!(matches("build:create", "build:create"));
        assert!(!matches("build:create", "build:delete"));
    }

    #[test]
    fn test_malformed_patterns_only_match_verbatim() {
        assert!(!matches("release", "release:read"));
        assert!(matches("legacy-flag", "legacy-flag"));
        assert!(!matches("release:*", "release"));
        assert!(!matches("release:*", "release:read:extra"));
    }

    #[test]
    fn test_permission_renders_as_pair() {
        let permission = Permission::new(Resource::EnvironmentGroup, Action::Delete);
        assert_eq!(permission.to_string(), "environment-group:delete");
    }

    #[test]
    fn test_grants() {
        let read_systems = Permission::new(Resource::System, Action::Read);
        let delete_builds = Permission::new(Resource::Build, Action::Delete);

        let grants = Grants::with_patterns(["system:*"]);
        assert!(grants.authorize(&read_systems).is_ok());
        let err = grants.authorize(&delete_builds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("build:delete"));

        assert!(Grants::admin().allows(&delete_builds));
        assert!(!Grants::default().allows(&read_systems));
    }
}
