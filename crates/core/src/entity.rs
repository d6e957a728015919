//! Entity traits: identity + per-user ownership.

use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that belongs to exactly one user.
///
/// Every lookup in the ledger is scoped by owner; a record owned by another
/// user is indistinguishable from a missing one.
pub trait Owned: Entity {
    fn owner(&self) -> UserId;

    fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner() == user_id
    }
}
