//! Access decisions composed from a closed set of predicates.
//!
//! Every protected operation is checked against an ordered predicate list,
//! evaluated short-circuit OR: any single match grants access. Collection
//! routes that reduce to role membership are gated by
//! [`crate::auth::token::RequiredRolesLayer`] instead; the tables here cover
//! the resources where ownership takes part in the decision.

use kritika_types::claim::ApiClaim;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Non-mutating actions, allowed by the read-only fallback.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    ReadOnly,
    IsAdmin,
    IsModerator,
    IsAuthor,
    IsSuperuser,
}

impl Predicate {
    fn allows(self, actor: Option<&ApiClaim>, action: Action, author_id: Option<i64>) -> bool {
        match self {
            Predicate::ReadOnly => action.is_safe(),
            Predicate::IsAdmin => actor.is_some_and(|a| a.role.is_admin()),
            Predicate::IsModerator => actor.is_some_and(|a| a.role.is_moderator()),
            // Create is a collection action, there is no author yet to
            // compare against; any authenticated actor qualifies. The
            // author check applies to mutations of an existing resource.
            Predicate::IsAuthor => actor.is_some_and(|a| {
                action.is_safe()
                    || action == Action::Create
                    || (a.user_id().is_some() && a.user_id() == author_id)
            }),
            Predicate::IsSuperuser => actor.is_some_and(|a| a.superuser),
        }
    }
}

pub struct Policy(pub &'static [Predicate]);

impl Policy {
    pub fn allows(&self, actor: Option<&ApiClaim>, action: Action, author_id: Option<i64>) -> bool {
        self.0.iter().any(|p| p.allows(actor, action, author_id))
    }

    /// Denial carries no resource state change: this runs strictly before
    /// the invariant/commit phase.
    pub fn authorize(
        &self,
        actor: Option<&ApiClaim>,
        action: Action,
        author_id: Option<i64>,
    ) -> Result<(), ApiError> {
        if self.allows(actor, action, author_id) {
            Ok(())
        } else if actor.is_none() {
            Err(ApiError::Unauthorized)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

pub const REVIEW_POLICY: Policy = Policy(&[
    Predicate::IsAdmin,
    Predicate::IsModerator,
    Predicate::IsAuthor,
    Predicate::ReadOnly,
]);

pub const COMMENT_POLICY: Policy = Policy(&[
    Predicate::IsAdmin,
    Predicate::IsModerator,
    Predicate::IsAuthor,
    Predicate::ReadOnly,
]);

pub const USER_POLICY: Policy = Policy(&[Predicate::IsSuperuser, Predicate::IsAdmin]);

#[cfg(test)]
mod tests {
    use kritika_types::claim::Role;

    use super::*;

    fn claim(id: i64, role: Role, superuser: bool) -> ApiClaim {
        ApiClaim::new_expired(id, format!("user{id}"), role, superuser)
    }

    #[test]
    fn test_anonymous_reads_but_cannot_mutate() {
        assert!(REVIEW_POLICY.allows(None, Action::List, Some(1)));
        assert!(REVIEW_POLICY.allows(None, Action::Retrieve, Some(1)));
        assert!(!REVIEW_POLICY.allows(None, Action::Create, None));
        assert!(!REVIEW_POLICY.allows(None, Action::Delete, Some(1)));
        assert!(matches!(
            REVIEW_POLICY.authorize(None, Action::Delete, Some(1)),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_any_authenticated_actor_creates() {
        let plain = claim(1, Role::User, false);
        assert!(REVIEW_POLICY.allows(Some(&plain), Action::Create, None));
        assert!(COMMENT_POLICY.allows(Some(&plain), Action::Create, None));
    }

    #[test]
    fn test_author_mutates_own_resource_only() {
        let author = claim(1, Role::User, false);
        let other = claim(2, Role::User, false);

        assert!(REVIEW_POLICY.allows(Some(&author), Action::Delete, Some(1)));
        assert!(REVIEW_POLICY.allows(Some(&author), Action::Update, Some(1)));
        assert!(!REVIEW_POLICY.allows(Some(&other), Action::Delete, Some(1)));
        assert!(matches!(
            REVIEW_POLICY.authorize(Some(&other), Action::Delete, Some(1)),
            Err(ApiError::Forbidden)
        ));
        // Safe actions stay open to any authenticated actor.
        assert!(REVIEW_POLICY.allows(Some(&other), Action::Retrieve, Some(1)));
    }

    #[test]
    fn test_moderator_and_admin_mutate_any() {
        let moderator = claim(3, Role::Moderator, false);
        let admin = claim(4, Role::Admin, false);

        assert!(REVIEW_POLICY.allows(Some(&moderator), Action::Delete, Some(1)));
        assert!(COMMENT_POLICY.allows(Some(&moderator), Action::Delete, Some(1)));
        assert!(REVIEW_POLICY.allows(Some(&admin), Action::Delete, Some(1)));
    }

    #[test]
    fn test_user_collection_policy() {
        let plain = claim(1, Role::User, false);
        let admin = claim(2, Role::Admin, false);
        let superuser = claim(3, Role::User, true);

        assert!(!USER_POLICY.allows(Some(&plain), Action::List, None));
        assert!(!USER_POLICY.allows(Some(&plain), Action::Retrieve, None));
        assert!(USER_POLICY.allows(Some(&admin), Action::List, None));
        assert!(USER_POLICY.allows(Some(&superuser), Action::List, None));
        assert!(!USER_POLICY.allows(None, Action::List, None));
    }

    #[test]
    fn test_missing_author_never_matches_author_rule() {
        let actor = claim(1, Role::User, false);
        assert!(!REVIEW_POLICY.allows(Some(&actor), Action::Delete, None));
    }
}
