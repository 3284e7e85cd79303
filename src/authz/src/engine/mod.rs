//! Authorization facade
//!
//! Composes aggregation, pattern matching, and the deny-overrides fold
//! into the public entry points:
//!
//! ```text
//! authorize ─► Aggregator (fetch + flatten) ─► pattern filter ─► decide
//!                  ▲
//!              [cache of effective sets, keyed (user, org)]
//! ```
//!
//! Both entry points are read-only; they never mutate directory state.
//! The engine holds no mutable state beyond the optional cache, so
//! concurrent calls need no locking on the decision path.

pub mod cache;
pub mod decision;

pub use cache::{CacheConfig, CacheStats, EffectiveSetCache};
pub use decision::{decide, Decision, DecisionDetail, MatchedStatement};

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::{Aggregator, SourcedStatement};
use crate::error::Result;
use crate::pattern::statement_matches;
use crate::store::DirectoryStore;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable the effective-set cache
    pub enable_cache: bool,

    /// Cache configuration
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache: CacheConfig::default(),
        }
    }
}

/// The authorization engine
///
/// Stateless per call except for the optional effective-set cache;
/// safe to share across request handlers behind an `Arc`.
pub struct AuthzEngine {
    aggregator: Aggregator,
    cache: Option<EffectiveSetCache>,
}

impl AuthzEngine {
    /// Create an engine over the given directory store
    pub fn new(config: EngineConfig, store: Arc<dyn DirectoryStore>) -> Self {
        let cache = config
            .enable_cache
            .then(|| EffectiveSetCache::new(config.cache.clone()));

        info!(cache = config.enable_cache, "authorization engine initialized");

        Self {
            aggregator: Aggregator::new(store),
            cache,
        }
    }

    /// Create an engine with default configuration
    pub fn with_defaults(store: Arc<dyn DirectoryStore>) -> Self {
        Self::new(EngineConfig::default(), store)
    }

    /// Decide whether a user may perform `action` on `resource`
    ///
    /// Errors are surfaced, not converted: the calling layer maps any
    /// of them to Deny for request-blocking checks (fail closed) while
    /// keeping the error kind for diagnostics.
    pub async fn authorize(
        &self,
        user_id: &str,
        org_id: &str,
        action: &str,
        resource: &str,
    ) -> Result<Decision> {
        Ok(self
            .authorize_detailed(user_id, org_id, action, resource)
            .await?
            .decision)
    }

    /// Decide with audit metadata: every matched statement and its
    /// source attachment
    pub async fn authorize_detailed(
        &self,
        user_id: &str,
        org_id: &str,
        action: &str,
        resource: &str,
    ) -> Result<DecisionDetail> {
        debug!(user_id, org_id, action, resource, "authorization request");

        let statements = self.effective_statements(user_id, org_id).await?;

        let matched: Vec<MatchedStatement> = statements
            .iter()
            .filter(|s| statement_matches(&s.statement, action, resource))
            .map(|s| MatchedStatement {
                policy_id: s.policy_id.clone(),
                level: s.level.clone(),
                effect: s.statement.effect,
            })
            .collect();

        let decision = decide(matched.iter().map(|m| m.effect));

        debug!(
            user_id,
            action,
            resource,
            matched = matched.len(),
            ?decision,
            "authorization decision"
        );

        Ok(DecisionDetail::new(decision, matched))
    }

    /// Reverse query: which of the candidate actions would `authorize`
    /// allow on `resource`?
    ///
    /// The candidate catalog is supplied by the caller; the engine does
    /// not enumerate action strings itself. Reuses the same aggregation
    /// and matching as `authorize`, so the two cannot disagree. On any
    /// aggregation failure the error propagates; partial grant lists
    /// are never returned.
    pub async fn list_granted_actions(
        &self,
        user_id: &str,
        org_id: &str,
        resource: &str,
        candidate_actions: &[String],
    ) -> Result<Vec<String>> {
        let statements = self.effective_statements(user_id, org_id).await?;

        let granted = candidate_actions
            .iter()
            .filter(|action| {
                let effects = statements
                    .iter()
                    .filter(|s| statement_matches(&s.statement, action, resource))
                    .map(|s| s.statement.effect);
                decide(effects).is_allowed()
            })
            .cloned()
            .collect();

        Ok(granted)
    }

    /// Evict cached effective sets for a user
    ///
    /// Write-path collaborators call this synchronously after any
    /// mutation affecting the user's grants, before acknowledging the
    /// write. No-op when no cache is configured.
    pub fn invalidate(&self, user_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_user(user_id);
            debug!(user_id, "invalidated cached effective sets");
        }
    }

    /// Evict cached effective sets for every user of an organization
    ///
    /// Used after org-level policy changes, team re-parenting, or any
    /// mutation whose blast radius is unclear; prefer eviction over
    /// serving stale data.
    pub fn invalidate_organization(&self, org_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_org(org_id);
            debug!(org_id, "invalidated cached effective sets for organization");
        }
    }

    /// Cache statistics, if a cache is configured
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(EffectiveSetCache::stats)
    }

    /// Fetch the effective set through the cache
    async fn effective_statements(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Arc<Vec<SourcedStatement>>> {
        if let Some(cache) = &self.cache {
            if let Some(statements) = cache.get(user_id, org_id) {
                debug!(user_id, org_id, "effective-set cache hit");
                return Ok(statements);
            }
        }

        let statements = Arc::new(self.aggregator.effective_statements(user_id, org_id).await?);

        if let Some(cache) = &self.cache {
            cache.put(user_id, org_id, Arc::clone(&statements));
        }

        Ok(statements)
    }
}
