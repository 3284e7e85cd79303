//! Directory store seam
//!
//! The engine consumes a read-only view of organizations, teams, users,
//! memberships, policies, and policy attachments. CRUD, validation of
//! acyclic parentage, and schema concerns live with the store's owner;
//! the engine only reads.
//!
//! `InMemoryDirectory` additionally exposes write helpers. They exist
//! for tests and for embedding the engine without a database; the
//! engine itself never calls them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use warden_core::{
    AttachmentLevel, OrgId, Organization, Policy, PolicyId, Team, TeamId, User, UserId,
};

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDirectory;

/// Read-only persistence surface consumed by the engine
///
/// Implementations must tolerate concurrent queries from many in-flight
/// authorization checks. Transient failures surface as
/// `StoreUnavailable`; the engine propagates them without retrying.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fetch an organization by id
    async fn get_organization(&self, id: &str) -> Result<Option<Organization>>;

    /// Fetch a user by id
    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Fetch a team by id, including its materialized path
    async fn get_team(&self, id: &str) -> Result<Option<Team>>;

    /// Team ids the user is a direct member of
    async fn get_team_memberships(&self, user_id: &str) -> Result<Vec<TeamId>>;

    /// Policy ids attached at the given level, in stable attachment order
    async fn get_attached_policies(&self, level: &AttachmentLevel) -> Result<Vec<PolicyId>>;

    /// Fetch a policy by id
    async fn get_policy(&self, id: &str) -> Result<Option<Policy>>;
}

#[derive(Default)]
struct Tables {
    organizations: HashMap<OrgId, Organization>,
    teams: HashMap<TeamId, Team>,
    users: HashMap<UserId, User>,
    policies: HashMap<PolicyId, Policy>,
    memberships: HashMap<UserId, Vec<TeamId>>,
    attachments: HashMap<AttachmentLevel, Vec<PolicyId>>,
}

/// In-memory directory store
///
/// Backed by `tokio::sync::RwLock`ed tables; cheap to clone and share.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an organization
    pub async fn insert_organization(&self, org: Organization) {
        self.inner.write().await.organizations.insert(org.id.clone(), org);
    }

    /// Insert or replace a team
    ///
    /// The caller is responsible for a consistent `path`; use
    /// `Team::root` / `Team::child_of` to derive it.
    pub async fn insert_team(&self, team: Team) {
        self.inner.write().await.teams.insert(team.id.clone(), team);
    }

    /// Insert or replace a user
    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    /// Insert or replace a policy
    pub async fn insert_policy(&self, policy: Policy) {
        self.inner.write().await.policies.insert(policy.id.clone(), policy);
    }

    /// Delete a policy row, leaving any attachments behind
    ///
    /// Detaching is a separate step; a deletion that skips it produces
    /// exactly the dangling-attachment corruption the aggregator must
    /// refuse to evaluate.
    pub async fn remove_policy(&self, policy_id: &str) {
        self.inner.write().await.policies.remove(policy_id);
    }

    /// Add a user to a team
    pub async fn add_member(&self, user_id: &str, team_id: &str) {
        let mut tables = self.inner.write().await;
        let teams = tables.memberships.entry(user_id.to_string()).or_default();
        if !teams.iter().any(|t| t == team_id) {
            teams.push(team_id.to_string());
        }
    }

    /// Remove a user from a team
    pub async fn remove_member(&self, user_id: &str, team_id: &str) {
        let mut tables = self.inner.write().await;
        if let Some(teams) = tables.memberships.get_mut(user_id) {
            teams.retain(|t| t != team_id);
        }
    }

    /// Attach a policy at a level (idempotent, preserves order)
    pub async fn attach_policy(&self, level: AttachmentLevel, policy_id: &str) {
        let mut tables = self.inner.write().await;
        let attached = tables.attachments.entry(level).or_default();
        if !attached.iter().any(|p| p == policy_id) {
            attached.push(policy_id.to_string());
        }
    }

    /// Detach a policy from a level
    pub async fn detach_policy(&self, level: &AttachmentLevel, policy_id: &str) {
        let mut tables = self.inner.write().await;
        if let Some(attached) = tables.attachments.get_mut(level) {
            attached.retain(|p| p != policy_id);
        }
    }

    /// Move a team under a new parent, rewriting the subtree's paths
    ///
    /// Rejects cross-organization moves and moves that would create a
    /// cycle (the new parent lying inside the moved team's subtree).
    /// Returns false and changes nothing when the move is invalid.
    pub async fn reparent_team(&self, team_id: &str, new_parent_id: &str) -> bool {
        let mut tables = self.inner.write().await;

        let (org_id, parent_path) = match (tables.teams.get(team_id), tables.teams.get(new_parent_id)) {
            (Some(team), Some(parent)) => {
                if team.org_id != parent.org_id || parent.path.iter().any(|t| t == team_id) {
                    return false;
                }
                (team.org_id.clone(), parent.path.clone())
            }
            _ => return false,
        };

        if let Some(team) = tables.teams.get_mut(team_id) {
            team.parent_id = Some(new_parent_id.to_string());
        }

        // rebuild every path in the organization from parent pointers
        rebuild_paths(&mut tables.teams, &org_id, team_id, &parent_path);
        true
    }
}

/// Rewrite the moved team's path and those of its descendants
fn rebuild_paths(
    teams: &mut HashMap<TeamId, Team>,
    org_id: &str,
    moved_id: &str,
    new_parent_path: &[TeamId],
) {
    let mut moved_path = new_parent_path.to_vec();
    moved_path.push(moved_id.to_string());

    // old subtree membership is identified by the old paths before rewrite
    let subtree: Vec<(TeamId, Vec<TeamId>)> = teams
        .values()
        .filter(|t| t.org_id == org_id && t.path.iter().any(|seg| seg == moved_id))
        .map(|t| {
            let tail_start = t.path.iter().position(|seg| seg == moved_id).unwrap_or(0);
            (t.id.clone(), t.path[tail_start + 1..].to_vec())
        })
        .collect();

    for (id, tail) in subtree {
        if let Some(team) = teams.get_mut(&id) {
            let mut path = moved_path.clone();
            path.extend(tail);
            team.path = path;
        }
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn get_organization(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self.inner.read().await.organizations.get(id).cloned())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>> {
        Ok(self.inner.read().await.teams.get(id).cloned())
    }

    async fn get_team_memberships(&self, user_id: &str) -> Result<Vec<TeamId>> {
        Ok(self
            .inner
            .read()
            .await
            .memberships
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_attached_policies(&self, level: &AttachmentLevel) -> Result<Vec<PolicyId>> {
        Ok(self
            .inner
            .read()
            .await
            .attachments
            .get(level)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_policy(&self, id: &str) -> Result<Option<Policy>> {
        Ok(self.inner.read().await.policies.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_membership_round_trip() {
        let dir = InMemoryDirectory::new();
        dir.add_member("u1", "t1").await;
        dir.add_member("u1", "t2").await;
        dir.add_member("u1", "t1").await; // idempotent

        assert_eq!(dir.get_team_memberships("u1").await.unwrap(), vec!["t1", "t2"]);

        dir.remove_member("u1", "t1").await;
        assert_eq!(dir.get_team_memberships("u1").await.unwrap(), vec!["t2"]);
    }

    #[tokio::test]
    async fn test_attachment_order_is_stable() {
        let dir = InMemoryDirectory::new();
        let level = AttachmentLevel::Team("t1".to_string());
        dir.attach_policy(level.clone(), "p2").await;
        dir.attach_policy(level.clone(), "p1").await;
        dir.attach_policy(level.clone(), "p2").await; // idempotent

        assert_eq!(
            dir.get_attached_policies(&level).await.unwrap(),
            vec!["p2", "p1"]
        );

        dir.detach_policy(&level, "p2").await;
        assert_eq!(dir.get_attached_policies(&level).await.unwrap(), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_reparent_rewrites_subtree_paths() {
        let dir = InMemoryDirectory::new();
        let root = Team::root("root", "org1", "Root");
        let a = Team::child_of(&root, "a", "A");
        let b = Team::child_of(&root, "b", "B");
        let a1 = Team::child_of(&a, "a1", "A1");
        for t in [&root, &a, &b, &a1] {
            dir.insert_team(t.clone()).await;
        }

        assert!(dir.reparent_team("a", "b").await);

        let a = dir.get_team("a").await.unwrap().unwrap();
        assert_eq!(a.parent_id.as_deref(), Some("b"));
        assert_eq!(a.path, vec!["root", "b", "a"]);

        let a1 = dir.get_team("a1").await.unwrap().unwrap();
        assert_eq!(a1.path, vec!["root", "b", "a", "a1"]);
    }

    #[tokio::test]
    async fn test_reparent_rejects_cycle() {
        let dir = InMemoryDirectory::new();
        let root = Team::root("root", "org1", "Root");
        let a = Team::child_of(&root, "a", "A");
        let a1 = Team::child_of(&a, "a1", "A1");
        for t in [&root, &a, &a1] {
            dir.insert_team(t.clone()).await;
        }

        // moving `a` under its own descendant must be refused
        assert!(!dir.reparent_team("a", "a1").await);
        let a = dir.get_team("a").await.unwrap().unwrap();
        assert_eq!(a.path, vec!["root", "a"]);
    }

    #[tokio::test]
    async fn test_reparent_rejects_cross_org() {
        let dir = InMemoryDirectory::new();
        let r1 = Team::root("r1", "org1", "R1");
        let r2 = Team::root("r2", "org2", "R2");
        dir.insert_team(r1).await;
        dir.insert_team(r2).await;

        assert!(!dir.reparent_team("r1", "r2").await);
    }
}
