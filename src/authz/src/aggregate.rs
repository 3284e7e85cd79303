//! Effective policy-set aggregation
//!
//! Collects every statement a user can reach: policies attached
//! directly to the user, policies attached to any team the user belongs
//! to plus every ancestor of those teams, and the organization's
//! default policies. The result is a pure function of current
//! attachments, recomputed per request (the engine layers an optional
//! cache on top).
//!
//! Aggregation fails closed: a dangling attachment or a hierarchy path
//! referencing a foreign or missing team aborts the whole computation.
//! A partial policy set must never be used to grant access.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::hierarchy;
use crate::store::DirectoryStore;
use warden_core::{AttachmentLevel, Policy, PolicyId, Statement, TeamId};

/// A statement tagged with the attachment it was reached through
///
/// The level tag carries no decision weight (deny overrides allow
/// regardless of position); it exists for audit and debug output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedStatement {
    /// Policy the statement came from
    pub policy_id: PolicyId,

    /// Attachment the policy was reached through
    pub level: AttachmentLevel,

    /// The statement itself
    pub statement: Statement,
}

/// Collects effective statements for a principal
pub struct Aggregator {
    store: Arc<dyn DirectoryStore>,
}

impl Aggregator {
    /// Create an aggregator over the given directory store
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Compute the effective statement sequence for a user
    ///
    /// Order is stable for audit output: user-level statements first,
    /// then team-level (memberships in sorted order, each ancestor
    /// chain root to leaf, shared ancestors visited once), then
    /// organization-level. A user belonging to a different organization
    /// than the requested one is reported as `NotFound`; organizations
    /// are fully isolated and requests must not act as a cross-tenant
    /// existence oracle.
    pub async fn effective_statements(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Vec<SourcedStatement>> {
        self.store
            .get_organization(org_id)
            .await?
            .ok_or_else(|| AuthzError::not_found("organization", org_id))?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .filter(|u| u.org_id == org_id)
            .ok_or_else(|| AuthzError::not_found("user", user_id))?;

        let mut statements = Vec::new();

        // 1. direct user grants
        self.collect(
            AttachmentLevel::User(user.id.clone()),
            org_id,
            &mut statements,
        )
        .await?;

        // 2. team grants, including inherited ancestor-team grants
        let mut memberships = self.store.get_team_memberships(user_id).await?;
        memberships.sort();
        memberships.dedup();

        let mut visited: Vec<TeamId> = Vec::new();
        let mut seen: HashSet<TeamId> = HashSet::new();
        for team_id in &memberships {
            let team = self.store.get_team(team_id).await?.ok_or_else(|| {
                AuthzError::CorruptState(format!(
                    "membership of user '{}' references missing team '{}'",
                    user_id, team_id
                ))
            })?;
            if team.org_id != org_id {
                return Err(AuthzError::CorruptState(format!(
                    "team '{}' belongs to organization '{}', not '{}'",
                    team.id, team.org_id, org_id
                )));
            }
            for ancestor in hierarchy::ancestor_chain(&team)? {
                if seen.insert(ancestor.clone()) {
                    visited.push(ancestor);
                }
            }
        }

        for team_id in &visited {
            let team = self.store.get_team(team_id).await?.ok_or_else(|| {
                AuthzError::CorruptState(format!(
                    "hierarchy path references missing team '{}'",
                    team_id
                ))
            })?;
            if team.org_id != org_id {
                return Err(AuthzError::CorruptState(format!(
                    "hierarchy path references foreign team '{}' (organization '{}')",
                    team.id, team.org_id
                )));
            }
            self.collect(AttachmentLevel::Team(team.id), org_id, &mut statements)
                .await?;
        }

        // 3. organization defaults
        self.collect(
            AttachmentLevel::Organization(org_id.to_string()),
            org_id,
            &mut statements,
        )
        .await?;

        debug!(
            user_id,
            org_id,
            teams = visited.len(),
            statements = statements.len(),
            "aggregated effective policy set"
        );

        Ok(statements)
    }

    /// Fetch the policies attached at one level and append their
    /// statements, tagged with that level
    async fn collect(
        &self,
        level: AttachmentLevel,
        org_id: &str,
        out: &mut Vec<SourcedStatement>,
    ) -> Result<()> {
        let policy_ids = self.store.get_attached_policies(&level).await?;
        let policies =
            try_join_all(policy_ids.iter().map(|id| self.store.get_policy(id))).await?;

        for (policy_id, policy) in policy_ids.iter().zip(policies) {
            let policy = policy.ok_or_else(|| {
                AuthzError::CorruptState(format!(
                    "attachment at {} references missing policy '{}'",
                    level, policy_id
                ))
            })?;
            if policy.org_id != org_id {
                return Err(AuthzError::CorruptState(format!(
                    "policy '{}' belongs to organization '{}', not '{}'",
                    policy.id, policy.org_id, org_id
                )));
            }

            let Policy { id, statements, .. } = policy;
            for statement in statements {
                out.push(SourcedStatement {
                    policy_id: id.clone(),
                    level: level.clone(),
                    statement,
                });
            }
        }

        Ok(())
    }
}
