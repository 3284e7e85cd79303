//! # Warden Core
//!
//! Shared domain model for the warden authorization platform:
//! organizations, hierarchical teams, users, and versioned policies.
//! The evaluation engine lives in `warden-authz`; this crate only
//! defines the entities that cross the store boundary.

pub mod types;

// Re-export commonly used types
pub use types::{
    AttachmentLevel, Effect, OrgId, Organization, Policy, PolicyId, Statement, Team, TeamId, User,
    UserId,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
