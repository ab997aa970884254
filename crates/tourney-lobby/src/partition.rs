//! Distributing members into lobbies of bounded capacity.
//!
//! Members are shuffled with a uniform permutation, the lobby count is
//! `ceil(members / capacity)`, and the member at shuffled position `p`
//! goes to lobby `p mod count`. Round-robin rather than block filling
//! keeps lobby sizes within one of each other.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use rand::Rng;
use rand::seq::SliceRandom;
use tourney_protocol::MemberId;

/// The result of partitioning: 1-based lobby index to its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    lobbies: BTreeMap<u32, Vec<MemberId>>,
}

impl Partition {
    /// Number of lobbies. Zero only when there were no members.
    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    /// Total members across all lobbies.
    pub fn member_count(&self) -> usize {
        self.lobbies.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    /// Members placed in lobby `index` (1-based).
    pub fn lobby(&self, index: u32) -> Option<&[MemberId]> {
        self.lobbies.get(&index).map(Vec::as_slice)
    }

    /// Lobbies in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[MemberId])> {
        self.lobbies.iter().map(|(index, members)| (*index, members.as_slice()))
    }

    /// Index of the lobby holding `member`, if any.
    pub fn lobby_of(&self, member: MemberId) -> Option<u32> {
        self.lobbies
            .iter()
            .find(|(_, members)| members.contains(&member))
            .map(|(index, _)| *index)
    }

    pub fn into_lobbies(self) -> BTreeMap<u32, Vec<MemberId>> {
        self.lobbies
    }
}

/// Partitions `members` using the thread-local RNG.
pub fn partition(
    members: impl IntoIterator<Item = MemberId>,
    capacity: NonZeroUsize,
) -> Partition {
    partition_with(members, capacity, &mut rand::rng())
}

/// Partitions `members` with a caller-supplied RNG.
///
/// Duplicate ids are collapsed first. The input order has no influence
/// on the result beyond what `rng` produces.
pub fn partition_with<R: Rng + ?Sized>(
    members: impl IntoIterator<Item = MemberId>,
    capacity: NonZeroUsize,
    rng: &mut R,
) -> Partition {
    let mut players: Vec<MemberId> = members.into_iter().collect();
    players.sort_unstable();
    players.dedup();

    if players.is_empty() {
        return Partition::default();
    }

    players.shuffle(rng);

    let count = players.len().div_ceil(capacity.get());
    let mut lobbies: BTreeMap<u32, Vec<MemberId>> = BTreeMap::new();
    for (position, member) in players.into_iter().enumerate() {
        let index = (position % count) as u32 + 1;
        lobbies.entry(index).or_default().push(member);
    }

    tracing::debug!(
        lobbies = count,
        capacity = capacity.get(),
        "members partitioned"
    );
    Partition { lobbies }
}
