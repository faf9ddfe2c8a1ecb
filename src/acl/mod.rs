//! Access control policies.
//!
//! A policy maps role names to the actions they permit. Two role names are
//! resolved against the request rather than the requester's group: `self`
//! applies when the requester is the target resource, `other` applies to
//! everyone else. Any remaining role name matches the requester's group.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Role name matched when the requester is the target resource.
pub const ROLE_SELF: &str = "self";

/// Role name matched when no other rule applies.
pub const ROLE_OTHER: &str = "other";

/// An action a requester can attempt on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// A single entry in a rule's permission list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grant {
    Read,
    Create,
    Update,
    Delete,
    All,
}

impl Grant {
    /// Whether this grant covers the given action.
    pub fn permits(self, action: Action) -> bool {
        match self {
            Grant::All => true,
            Grant::Read => action == Action::Read,
            Grant::Create => action == Action::Create,
            Grant::Update => action == Action::Update,
            Grant::Delete => action == Action::Delete,
        }
    }
}

/// Access control policy for a resource: role name to permitted actions.
#[derive(Debug, Clone, Default)]
pub struct AclPolicy {
    rules: BTreeMap<String, Vec<Grant>>,
}

impl AclPolicy {
    /// Create an empty policy (denies everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for the `users` resource.
    pub fn users() -> Self {
        let mut policy = Self::new();
        policy.insert(ROLE_SELF, vec![Grant::Read, Grant::Update]);
        policy.insert("administrator", vec![Grant::All]);
        policy.insert(ROLE_OTHER, vec![Grant::Read]);
        policy
    }

    /// Add or replace a rule.
    pub fn insert(&mut self, role: impl Into<String>, grants: Vec<Grant>) {
        self.rules.insert(role.into(), grants);
    }

    /// Role names present in the policy.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Grants of a named rule, if present.
    pub fn grants(&self, role: &str) -> Option<&[Grant]> {
        self.rules.get(role).map(Vec::as_slice)
    }

    fn rule_permits(&self, role: &str, action: Action) -> bool {
        self.rules
            .get(role)
            .is_some_and(|grants| grants.iter().any(|g| g.permits(action)))
    }

    /// Decide whether a requester may perform an action.
    ///
    /// Rules are consulted most-specific first: a rule named after the
    /// requester's group, then `self` when the requester is the target,
    /// then `other`. Grants are a union, so any matching rule allows.
    /// Collection operations pass `None` as the target and never match
    /// `self`.
    pub fn allows(
        &self,
        requester_id: &str,
        requester_group: &str,
        target_id: Option<&str>,
        action: Action,
    ) -> bool {
        if self.rule_permits(requester_group, action) {
            return true;
        }

        if target_id == Some(requester_id) && self.rule_permits(ROLE_SELF, action) {
            return true;
        }

        self.rule_permits(ROLE_OTHER, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_policy_roles() {
        let policy = AclPolicy::users();
        let roles: Vec<&str> = policy.roles().collect();
        assert_eq!(roles, vec!["administrator", "other", "self"]);

        assert_eq!(
            policy.grants("self").unwrap(),
            &[Grant::Read, Grant::Update]
        );
        assert_eq!(policy.grants("administrator").unwrap(), &[Grant::All]);
        assert_eq!(policy.grants("other").unwrap(), &[Grant::Read]);
    }

    #[test]
    fn test_grant_permits() {
        assert!(Grant::All.permits(Action::Delete));
        assert!(Grant::Read.permits(Action::Read));
        assert!(!Grant::Read.permits(Action::Update));
        assert!(!Grant::Update.permits(Action::Delete));
    }

    #[test]
    fn test_administrator_allows_everything() {
        let policy = AclPolicy::users();
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(
                policy.allows("usr_a", "administrator", Some("usr_b"), action),
                "administrator should be allowed to {action}"
            );
            assert!(policy.allows("usr_a", "administrator", None, action));
        }
    }

    #[test]
    fn test_self_can_read_and_update_only() {
        let policy = AclPolicy::users();
        assert!(policy.allows("usr_a", "staff", Some("usr_a"), Action::Read));
        assert!(policy.allows("usr_a", "staff", Some("usr_a"), Action::Update));
        assert!(!policy.allows("usr_a", "staff", Some("usr_a"), Action::Delete));
    }

    #[test]
    fn test_other_can_only_read() {
        let policy = AclPolicy::users();
        assert!(policy.allows("usr_a", "staff", Some("usr_b"), Action::Read));
        assert!(!policy.allows("usr_a", "staff", Some("usr_b"), Action::Update));
        assert!(!policy.allows("usr_a", "staff", Some("usr_b"), Action::Delete));
        assert!(!policy.allows("usr_a", "staff", None, Action::Create));
    }

    #[test]
    fn test_collection_operations_never_match_self() {
        let policy = AclPolicy::users();
        // Listing is a read on the collection, allowed through `other`.
        assert!(policy.allows("usr_a", "staff", None, Action::Read));
        // Creating has no target; only the group rule can grant it.
        assert!(!policy.allows("usr_a", "staff", None, Action::Create));
    }

    #[test]
    fn test_empty_policy_denies() {
        let policy = AclPolicy::new();
        assert!(!policy.allows("usr_a", "administrator", Some("usr_a"), Action::Read));
    }
}
