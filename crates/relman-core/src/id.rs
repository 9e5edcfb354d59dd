//! Resource identifiers.
//!
//! Every entity gets its own identifier newtype so a `SystemId` can never be
//! handed to a lookup expecting a `ReleaseId`. All of them wrap a UUIDv7,
//! which keeps freshly created rows time-ordered.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
        )]
        #[serde(transparent)]
        #[display("{_0}")]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

resource_id!(
    /// Identifies a catalog System (parent, standalone or subsystem).
    SystemId
);
resource_id!(ReleaseId);
resource_id!(BuildId);
resource_id!(EnvironmentId);
resource_id!(EnvironmentGroupId);
resource_id!(
    /// Identifies a single environment membership row.
    EnvironmentSystemId
);
resource_id!(
    /// Stable caller identifier handed over by the authentication layer.
    UserId
);
