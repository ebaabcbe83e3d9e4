//! Authorization rules shared by every mutating endpoint.

use crate::types::{Identity, UserId};

/// A post may be changed by its author or by an admin.
pub fn can_mutate_post(identity: &Identity, author_id: UserId) -> bool {
    identity.user_id == author_id || identity.role.is_admin()
}

/// Users may vote for anyone but themselves.
pub fn can_vote_for(voter: UserId, candidate: UserId) -> bool {
    voter != candidate
}
