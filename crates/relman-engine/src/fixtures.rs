//! Shared setup for the engine's unit tests.

use std::sync::Arc;

use chrono::Utc;
use relman_core::build::NewBuild;
use relman_core::environment::{EnvironmentType, NewEnvironment};
use relman_core::id::{ReleaseId, SystemId};
use relman_core::membership::AddSystem;
use relman_core::release::{NewRelease, ReleaseType};
use relman_core::store::memory::MemoryStore;
use relman_core::system::{NewSystem, System, SystemType};

use crate::Engine;

pub fn engine() -> (Engine, MemoryStore) {
    let store = MemoryStore::new();
    (Engine::new(Arc::new(store.clone())), store)
}

pub fn new_system(name: &str, system_type: SystemType, parent_id: Option<SystemId>) -> NewSystem {
    NewSystem {
        name: name.to_string(),
        system_type,
        parent_id,
        status: None,
        description: None,
    }
}

pub fn new_release(name: &str) -> NewRelease {
    NewRelease {
        name: name.to_string(),
        description: None,
        release_date: Utc::now(),
        status: None,
        release_type: ReleaseType::Minor,
    }
}

pub fn new_build(system_id: SystemId, release_id: Option<ReleaseId>, version: &str) -> NewBuild {
    NewBuild {
        system_id,
        release_id,
        version: version.to_string(),
        build_date: Utc::now(),
    }
}

pub fn new_environment(name: &str, release_id: ReleaseId) -> NewEnvironment {
    NewEnvironment {
        name: name.to_string(),
        environment_type: EnvironmentType::Staging,
        release_id,
        status: None,
        group_id: None,
        url: None,
        description: None,
    }
}

pub fn add_system(system_id: SystemId) -> AddSystem {
    AddSystem {
        system_id,
        version: None,
        status: None,
    }
}

/// `PaymentsGroup` with subsystems `Gateway` and `Ledger`.
pub async fn payments_group(engine: &Engine) -> (System, System, System) {
    let parent = engine
        .catalog
        .create(new_system("PaymentsGroup", SystemType::Parent, None))
        .await
        .unwrap();
    let gateway = engine
        .catalog
        .create(new_system("Gateway", SystemType::Subsystem, Some(parent.id)))
        .await
        .unwrap();
    let ledger = engine
        .catalog
        .create(new_system("Ledger", SystemType::Subsystem, Some(parent.id)))
        .await
        .unwrap();
    (parent, gateway, ledger)
}
