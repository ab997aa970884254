//! Partition properties over many seeded inputs.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tourney_lobby::{Eligibility, PresenceConfig, Venue, classify, partition_with};
use tourney_protocol::{ChannelId, GuildId, MemberId, PresenceFacts, Status, VoiceState};

// =========================================================================
// Partition
// =========================================================================

fn check_partition(count: usize, capacity: usize, seed: u64) {
    let members: Vec<MemberId> = (1..=count as u64).map(MemberId).collect();
    let capacity = NonZeroUsize::new(capacity).unwrap();
    let result = partition_with(members.clone(), capacity, &mut StdRng::seed_from_u64(seed));

    assert_eq!(result.member_count(), count);
    assert_eq!(result.lobby_count(), count.div_ceil(capacity.get()));

    let mut seen = BTreeSet::new();
    for (_, lobby) in result.iter() {
        for member in lobby {
            assert!(seen.insert(*member), "{member} placed twice");
        }
    }
    assert_eq!(seen, members.into_iter().collect::<BTreeSet<_>>());

    let sizes: Vec<usize> = result.iter().map(|(_, lobby)| lobby.len()).collect();
    if let (Some(max), Some(min)) = (sizes.iter().max(), sizes.iter().min()) {
        assert!(max - min <= 1, "sizes {sizes:?}");
        assert!(*max <= capacity.get());
    }

    let indices: Vec<u32> = result.iter().map(|(index, _)| index).collect();
    let expected: Vec<u32> = (1..=result.lobby_count() as u32).collect();
    assert_eq!(indices, expected);
}

#[test]
fn test_partition_invariants_hold_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(0x70ff);
    for seed in 0..300 {
        let count = rng.random_range(0..60);
        let capacity = rng.random_range(1..15);
        check_partition(count, capacity, seed);
    }
}

#[test]
fn test_partition_three_members_capacity_one_gives_three_lobbies() {
    check_partition(3, 1, 1);
}

#[test]
fn test_partition_exact_multiple_fills_every_lobby() {
    let members: Vec<MemberId> = (1..=30).map(MemberId).collect();
    let result = partition_with(members, NonZeroUsize::new(10).unwrap(), &mut StdRng::seed_from_u64(9));
    assert!(result.iter().all(|(_, lobby)| lobby.len() == 10));
}

#[test]
fn test_partition_shuffles_between_seeds() {
    let members: Vec<MemberId> = (1..=40).map(MemberId).collect();
    let capacity = NonZeroUsize::new(10).unwrap();
    let first = partition_with(members.clone(), capacity, &mut StdRng::seed_from_u64(1));
    let differs = (2..10).any(|seed| {
        partition_with(members.clone(), capacity, &mut StdRng::seed_from_u64(seed)) != first
    });
    assert!(differs);
}

// =========================================================================
// Classification is total
// =========================================================================

#[test]
fn test_classify_every_combination_yields_one_category() {
    let presence = PresenceConfig::default();
    let venue = Venue::new(GuildId(1), ChannelId(10), &presence);
    let statuses = [
        Status::Online,
        Status::Idle,
        Status::DoNotDisturb,
        Status::Invisible,
        Status::Offline,
    ];
    let voices = [
        None,
        Some((2, 10, None)),
        Some((1, 10, Some("Among Us"))),
        Some((1, 11, Some("Among Us"))),
        Some((1, 11, Some("General"))),
        Some((1, 11, None)),
    ];

    for voice in voices {
        for mobile in [false, true] {
            for status in statuses {
                let facts = PresenceFacts {
                    voice: voice.map(|(guild, room, category)| VoiceState {
                        guild: GuildId(guild),
                        room: ChannelId(room),
                        category: category.map(str::to_string),
                    }),
                    mobile,
                    status,
                };
                let category = classify(&facts, &venue);
                let expected = match voice {
                    None | Some((2, _, _)) => Eligibility::Faraway,
                    Some((_, 10, _)) => Eligibility::AlreadyPresent,
                    _ if mobile => Eligibility::Mobile,
                    _ if status.is_hidden() => Eligibility::Invisible,
                    Some((_, _, Some("Among Us"))) => Eligibility::Busy,
                    _ => Eligibility::Eligible,
                };
                assert_eq!(category, expected, "{facts:?}");
            }
        }
    }
}
