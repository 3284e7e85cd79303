//! # Warden Authorization Engine
//!
//! Multi-tenant, policy-based access control. Organizations contain
//! hierarchical teams and users; versioned policies of allow/deny
//! statements attach at the organization, team, or user level, and an
//! authorization decision combines all three with deny-overrides,
//! default-deny semantics.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_authz::{AuthzEngine, Decision, InMemoryDirectory};
//! use warden_core::{AttachmentLevel, Organization, Policy, Statement, User};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = InMemoryDirectory::new();
//!     dir.insert_organization(Organization::new("org1", "Acme")).await;
//!     dir.insert_user(User::new("alice", "org1", "Alice")).await;
//!     dir.insert_policy(Policy::new(
//!         "p1",
//!         "org1",
//!         "readers",
//!         vec![Statement::allow(
//!             vec!["docs:read".to_string()],
//!             vec!["*".to_string()],
//!         )],
//!     ))
//!     .await;
//!     dir.attach_policy(AttachmentLevel::Organization("org1".into()), "p1")
//!         .await;
//!
//!     let engine = AuthzEngine::with_defaults(Arc::new(dir));
//!     let decision = engine.authorize("alice", "org1", "docs:read", "file42").await?;
//!     assert_eq!(decision, Decision::Allow);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod pattern;
pub mod store;

// Re-export commonly used types
pub use aggregate::{Aggregator, SourcedStatement};
pub use engine::{
    decide, AuthzEngine, CacheConfig, CacheStats, Decision, DecisionDetail, EngineConfig,
    MatchedStatement,
};
pub use error::{AuthzError, Result};
pub use pattern::{pattern_matches, statement_matches, Pattern};
pub use store::{DirectoryStore, InMemoryDirectory};

#[cfg(feature = "postgres")]
pub use store::PostgresDirectory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
