//! Decision types and the deny-overrides combination rule

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{AttachmentLevel, Effect, PolicyId};

/// Final authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// Access granted
    Allow,
    /// Access denied
    Deny,
}

impl Decision {
    /// Whether this decision grants access
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Combine the effects of the statements that matched a request
///
/// Deny-overrides with default-deny: any matching Deny wins, otherwise
/// any matching Allow grants, otherwise (nothing matched) Deny. A pure
/// fold, deterministic and independent of evaluation order.
pub fn decide(effects: impl IntoIterator<Item = Effect>) -> Decision {
    let mut saw_allow = false;
    for effect in effects {
        match effect {
            Effect::Deny => return Decision::Deny,
            Effect::Allow => saw_allow = true,
        }
    }
    if saw_allow {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// A statement that matched the request, for audit output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedStatement {
    /// Policy the statement came from
    pub policy_id: PolicyId,

    /// Attachment the policy was reached through
    pub level: AttachmentLevel,

    /// The statement's effect
    pub effect: Effect,
}

/// Decision with audit metadata
///
/// `authorize` is a thin projection of this; both share one evaluation
/// path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionDetail {
    /// Unique decision identifier
    pub id: Uuid,

    /// The final decision
    pub decision: Decision,

    /// Every statement that matched the request, in aggregation order
    pub matched: Vec<MatchedStatement>,

    /// Evaluation timestamp (milliseconds since epoch)
    pub evaluated_at_ms: i64,
}

impl DecisionDetail {
    /// Build a detail record from the matched statements
    pub fn new(decision: Decision, matched: Vec<MatchedStatement>) -> Self {
        Self {
            id: Uuid::new_v4(),
            decision,
            matched,
            evaluated_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}
