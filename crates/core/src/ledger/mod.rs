//! Per-member votes on catalog entries.

mod types;

pub use types::*;

use std::collections::HashSet;

use crate::catalog::EntryId;
use crate::messenger::UserId;
use crate::store::StoreError;

/// Trait for rating storage.
///
/// A member holds at most one rating per entry.
pub trait RatingLedger: Send + Sync {
    /// Record a vote, replacing any earlier vote by the same member on the same entry.
    fn upsert(
        &self,
        member: UserId,
        entry: EntryId,
        direction: VoteDirection,
    ) -> Result<(), StoreError>;

    /// Withdraw a member's vote. Returns whether a vote existed.
    fn remove(&self, member: UserId, entry: EntryId) -> Result<bool, StoreError>;

    /// Up and down counts for an entry. Unknown entries tally to zero.
    fn tally(&self, entry: EntryId) -> Result<Tally, StoreError>;

    /// A member's votes in ascending entry order.
    fn list_by_member(&self, member: UserId) -> Result<Vec<RatingRecord>, StoreError>;

    /// Delete every rating cast by a member absent from `membership`.
    ///
    /// Returns the number of ratings removed.
    fn prune_missing_members(&self, membership: &HashSet<UserId>) -> Result<usize, StoreError>;

    fn rating_count(&self) -> Result<usize, StoreError>;
}
