//! Team hierarchy resolution
//!
//! Teams carry a materialized path (root team id first, own id last),
//! so computing the set of teams whose policies a team inherits is a
//! pure decomposition of that path rather than pointer chasing.
//! Parentage is validated acyclic at write time; read paths trust the
//! path invariant and treat violations as fatal data corruption.

use crate::error::{AuthzError, Result};
use warden_core::{Team, TeamId};

/// Compute the ancestor chain for a team, root first, the team itself
/// last.
///
/// Fails with `CorruptState` when the materialized path is malformed:
/// empty, or not terminating in the team's own id. Cross-organization
/// path segments are caught by the aggregator when it fetches each
/// ancestor.
pub fn ancestor_chain(team: &Team) -> Result<Vec<TeamId>> {
    if !team.path_is_consistent() {
        return Err(AuthzError::CorruptState(format!(
            "team '{}' has a malformed hierarchy path {:?}",
            team.id, team.path
        )));
    }
    Ok(team.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_includes_root_mid_leaf() {
        let root = Team::root("root", "org1", "Root");
        let mid = Team::child_of(&root, "mid", "Mid");
        let leaf = Team::child_of(&mid, "leaf", "Leaf");

        let chain = ancestor_chain(&leaf).unwrap();
        assert_eq!(chain, vec!["root", "mid", "leaf"]);
    }

    #[test]
    fn test_root_team_chain_is_itself() {
        let root = Team::root("root", "org1", "Root");
        assert_eq!(ancestor_chain(&root).unwrap(), vec!["root"]);
    }

    #[test]
    fn test_path_not_ending_in_own_id_is_corrupt() {
        let mut team = Team::root("t1", "org1", "Team");
        team.path = vec!["t1".to_string(), "t2".to_string()];

        let err = ancestor_chain(&team).unwrap_err();
        assert!(matches!(err, AuthzError::CorruptState(_)));
    }

    #[test]
    fn test_empty_path_is_corrupt() {
        let mut team = Team::root("t1", "org1", "Team");
        team.path.clear();

        let err = ancestor_chain(&team).unwrap_err();
        assert!(matches!(err, AuthzError::CorruptState(_)));
    }
}
