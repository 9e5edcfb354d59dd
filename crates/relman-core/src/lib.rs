//! Core domain types and rules for relman.
//!
//! This crate contains:
//! - Resource identifiers and the shared error type
//! - Systems, releases, builds, environments and environment membership
//! - The pure validation half of every operation (`validate_*`)
//! - The permission evaluator
//! - Storage ports, plus an in-memory implementation

#[macro_use]
mod macros;

pub mod access;
pub mod build;
pub mod environment;
pub mod error;
pub mod id;
pub mod membership;
pub mod release;
pub mod store;
pub mod system;

pub use error::{Error, ErrorKind, Result};
