//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique organization identifier
pub type OrgId = String;

/// Unique team identifier
pub type TeamId = String;

/// Unique user identifier
pub type UserId = String;

/// Unique policy identifier
pub type PolicyId = String;

/// Organization - the root of tenant isolation
///
/// Every team, user, and policy belongs to exactly one organization.
/// Authorization never crosses organization boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization identifier
    pub id: OrgId,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl Organization {
    /// Create a new organization
    pub fn new(id: impl Into<OrgId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Team within an organization, optionally nested under a parent team
///
/// `path` is the materialized ancestor chain from the organization root
/// team down to this team, inclusive. Invariants maintained by the
/// write path: `path` always terminates in the team's own id, a child's
/// path is its parent's path plus the child id, and every segment
/// belongs to the same organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier
    pub id: TeamId,

    /// Owning organization
    pub org_id: OrgId,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Parent team, None for a root team
    #[serde(default)]
    pub parent_id: Option<TeamId>,

    /// Materialized ancestor chain, root first, self last
    pub path: Vec<TeamId>,
}

impl Team {
    /// Create a root team (no parent, path is just the team itself)
    pub fn root(id: impl Into<TeamId>, org_id: impl Into<OrgId>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id: id.clone(),
            org_id: org_id.into(),
            name: name.into(),
            description: String::new(),
            parent_id: None,
            path: vec![id],
        }
    }

    /// Create a child team under the given parent, deriving the path
    pub fn child_of(parent: &Team, id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        let id = id.into();
        let mut path = parent.path.clone();
        path.push(id.clone());
        Self {
            id,
            org_id: parent.org_id.clone(),
            name: name.into(),
            description: String::new(),
            parent_id: Some(parent.id.clone()),
            path,
        }
    }

    /// Whether this team is an organization root team
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the materialized path terminates in this team's own id
    ///
    /// Read paths trust this invariant; a false result means the stored
    /// hierarchy is corrupt, not that the input was merely unusual.
    pub fn path_is_consistent(&self) -> bool {
        !self.path.is_empty() && self.path.last() == Some(&self.id)
    }
}

/// User belonging to an organization
///
/// Team memberships are a separate many-to-many relation held by the
/// directory store, not embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: UserId,

    /// Owning organization
    pub org_id: OrgId,

    /// Display name
    pub name: String,
}

impl User {
    /// Create a new user
    pub fn new(
        id: impl Into<UserId>,
        org_id: impl Into<OrgId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            org_id: org_id.into(),
            name: name.into(),
        }
    }
}

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// A single allow/deny rule over action and resource patterns
///
/// Patterns use the colon-segment wildcard grammar implemented in
/// `warden-authz` (e.g. `documents:read`, `org:42:reports:*`). A
/// statement applies to a request only when at least one action pattern
/// matches the requested action and at least one resource pattern
/// matches the requested resource; empty pattern sets match nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Allow or Deny
    pub effect: Effect,

    /// Action patterns this statement covers
    #[serde(default)]
    pub actions: Vec<String>,

    /// Resource patterns this statement covers
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Statement {
    /// Create an allow statement
    pub fn allow(actions: Vec<String>, resources: Vec<String>) -> Self {
        Self {
            effect: Effect::Allow,
            actions,
            resources,
        }
    }

    /// Create a deny statement
    pub fn deny(actions: Vec<String>, resources: Vec<String>) -> Self {
        Self {
            effect: Effect::Deny,
            actions,
            resources,
        }
    }
}

/// Versioned policy - an ordered set of statements
///
/// Each stored policy row is independently attachable and is evaluated
/// as-is; `version` is carried as metadata and there is no implicit
/// latest-version selection at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy identifier
    pub id: PolicyId,

    /// Owning organization
    pub org_id: OrgId,

    /// Display name
    pub name: String,

    /// Policy version
    #[serde(default = "default_version")]
    pub version: i32,

    /// Ordered statements
    pub statements: Vec<Statement>,
}

fn default_version() -> i32 {
    1
}

impl Policy {
    /// Create a new policy at version 1
    pub fn new(
        id: impl Into<PolicyId>,
        org_id: impl Into<OrgId>,
        name: impl Into<String>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            id: id.into(),
            org_id: org_id.into(),
            name: name.into(),
            version: 1,
            statements,
        }
    }
}

/// Attachment level - where a policy is linked
///
/// Organization, team, and user attachments are one polymorphic concept
/// rather than three parallel code paths; the aggregator tags every
/// collected statement with the level it arrived through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "level", content = "id")]
pub enum AttachmentLevel {
    /// Attached to the organization itself
    Organization(OrgId),
    /// Attached to a team (directly or reached via inheritance)
    Team(TeamId),
    /// Attached directly to a user
    User(UserId),
}

impl AttachmentLevel {
    /// The entity id the policy is attached to
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Organization(id) | Self::Team(id) | Self::User(id) => id,
        }
    }
}

impl fmt::Display for AttachmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization(id) => write!(f, "org:{}", id),
            Self::Team(id) => write!(f, "team:{}", id),
            Self::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_path_derivation() {
        let root = Team::root("t-root", "org1", "Root");
        assert!(root.is_root());
        assert_eq!(root.path, vec!["t-root".to_string()]);
        assert!(root.path_is_consistent());

        let eng = Team::child_of(&root, "t-eng", "Engineering");
        assert_eq!(eng.parent_id.as_deref(), Some("t-root"));
        assert_eq!(eng.org_id, "org1");
        assert_eq!(eng.path, vec!["t-root".to_string(), "t-eng".to_string()]);

        let platform = Team::child_of(&eng, "t-platform", "Platform");
        assert_eq!(
            platform.path,
            vec![
                "t-root".to_string(),
                "t-eng".to_string(),
                "t-platform".to_string()
            ]
        );
    }

    #[test]
    fn test_path_consistency_check() {
        let mut team = Team::root("t1", "org1", "Team");
        assert!(team.path_is_consistent());

        team.path = vec!["other".to_string()];
        assert!(!team.path_is_consistent());

        team.path.clear();
        assert!(!team.path_is_consistent());
    }

    #[test]
    fn test_effect_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Effect::Allow).unwrap(), "\"ALLOW\"");
        assert_eq!(serde_json::to_string(&Effect::Deny).unwrap(), "\"DENY\"");
    }

    #[test]
    fn test_attachment_level_display() {
        let level = AttachmentLevel::Team("t-eng".to_string());
        assert_eq!(level.to_string(), "team:t-eng");
        assert_eq!(level.entity_id(), "t-eng");
    }

    #[test]
    fn test_policy_roundtrip() {
        let policy = Policy::new(
            "p1",
            "org1",
            "docs access",
            vec![Statement::allow(
                vec!["docs:*".to_string()],
                vec!["*".to_string()],
            )],
        );

        let json = serde_json::to_string(&policy).unwrap();
        let back: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
        assert_eq!(back.version, 1);
    }
}
