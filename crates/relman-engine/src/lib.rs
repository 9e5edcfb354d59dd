//! Domain-consistency engine for relman.
//!
//! One service per component. Each operation opens a single store
//! transaction, gathers the facts its validation needs, runs the pure
//! `validate_*` function from `relman-core`, and only then writes and commits.
//! A failed validation therefore never leaves a partial write behind.

pub mod builds;
pub mod catalog;
pub mod environments;
pub mod membership;
pub mod releases;

#[cfg(test)]
mod fixtures;

use std::fmt::Display;
use std::sync::Arc;

use relman_core::store::Store;
use relman_core::{Error, Result};

pub use builds::Builds;
pub use catalog::Catalog;
pub use environments::{EnvironmentGroupDetail, Environments};
pub use membership::{
    AddedSystems, EnvironmentSystemDetail, EnvironmentSystemsListing, Membership, SyncReport,
};
pub use releases::Releases;

/// All services, sharing one store handle.
#[derive(Clone)]
pub struct Engine {
    pub catalog: Catalog,
    pub releases: Releases,
    pub builds: Builds,
    pub environments: Environments,
    pub membership: Membership,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            releases: Releases::new(store.clone()),
            builds: Builds::new(store.clone()),
            environments: Environments::new(store.clone()),
            membership: Membership::new(store),
        }
    }
}

/// Turn a missing row into a `NotFound` error.
pub(crate) fn require<T>(row: Option<T>, what: &str, id: impl Display) -> Result<T> {
    row.ok_or_else(|| Error::not_found(what, id))
}
