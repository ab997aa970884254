//! Permission overwrites applied to the session's channels.
//!
//! When a verified role is configured, `@everyone` keeps only the deny
//! part of its overwrite and the verified role receives the allow part.

use tourney_platform::{Overwrite, OverwriteTarget, Permission};
use tourney_protocol::RoleId;

use Permission::{Connect, ManageMessages, SendMessages, Speak, View};

/// Roles the overwrites refer to.
#[derive(Debug, Clone, Copy)]
pub struct OverwriteRoles {
    pub participant: RoleId,
    pub manager: RoleId,
    pub banned: RoleId,
    pub verified: Option<RoleId>,
}

fn with_everyone(everyone: Overwrite, verified: Option<RoleId>, mut rest: Vec<Overwrite>) -> Vec<Overwrite> {
    let mut overwrites = Vec::with_capacity(rest.len() + 2);
    match verified {
        Some(role) => {
            let mut grant = Overwrite::new(OverwriteTarget::Role(role));
            grant.allow = everyone.allow.clone();
            overwrites.push(everyone.deny_only());
            overwrites.push(grant);
        }
        None => overwrites.push(everyone),
    }
    overwrites.append(&mut rest);
    overwrites
}

pub fn category_overwrites(roles: &OverwriteRoles) -> Vec<Overwrite> {
    with_everyone(
        Overwrite::new(OverwriteTarget::Everyone).allow([View]),
        roles.verified,
        vec![Overwrite::new(OverwriteTarget::Role(roles.banned)).deny([SendMessages, Connect])],
    )
}

/// Everyone reads the operations channel; only tagged members write.
pub fn chat_overwrites(roles: &OverwriteRoles) -> Vec<Overwrite> {
    with_everyone(
        Overwrite::new(OverwriteTarget::Everyone)
            .allow([View])
            .deny([SendMessages]),
        roles.verified,
        vec![
            Overwrite::new(OverwriteTarget::Role(roles.participant)).allow([SendMessages]),
            Overwrite::new(OverwriteTarget::Role(roles.manager)).allow([SendMessages, ManageMessages]),
            Overwrite::new(OverwriteTarget::Role(roles.banned)).deny([SendMessages]),
        ],
    )
}

/// Everyone sees the waiting room; participants and managers may join.
pub fn waiting_room_overwrites(roles: &OverwriteRoles) -> Vec<Overwrite> {
    with_everyone(
        Overwrite::new(OverwriteTarget::Everyone)
            .allow([View])
            .deny([Connect]),
        roles.verified,
        vec![
            Overwrite::new(OverwriteTarget::Role(roles.participant)).allow([Connect, Speak]),
            Overwrite::new(OverwriteTarget::Role(roles.manager)).allow([Connect, Speak]),
            Overwrite::new(OverwriteTarget::Role(roles.banned)).deny([Connect]),
        ],
    )
}

/// A lobby room is hidden from everyone but its lobby role and managers.
pub fn lobby_overwrites(lobby_role: RoleId, manager: RoleId) -> Vec<Overwrite> {
    vec![
        Overwrite::new(OverwriteTarget::Everyone).deny([View, Connect]),
        Overwrite::new(OverwriteTarget::Role(lobby_role)).allow([View, Connect, Speak]),
        Overwrite::new(OverwriteTarget::Role(manager)).allow([View, Connect, Speak]),
    ]
}

/// `overwrite` with [`Permission::Speak`] denied (`muted`) or allowed.
pub fn toggle_speak(overwrite: Overwrite, muted: bool) -> Overwrite {
    if muted {
        overwrite.deny([Speak])
    } else {
        overwrite.allow([Speak])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(verified: Option<RoleId>) -> OverwriteRoles {
        OverwriteRoles {
            participant: RoleId(1),
            manager: RoleId(2),
            banned: RoleId(3),
            verified,
        }
    }

    fn everyone(overwrites: &[Overwrite]) -> &Overwrite {
        overwrites
            .iter()
            .find(|o| o.target == OverwriteTarget::Everyone)
            .unwrap()
    }

    #[test]
    fn test_chat_without_verified_role_lets_everyone_view() {
        let overwrites = chat_overwrites(&roles(None));
        let everyone = everyone(&overwrites);
        assert!(everyone.allows(View));
        assert!(everyone.denies(SendMessages));
    }

    #[test]
    fn test_verified_role_takes_allow_part() {
        let overwrites = chat_overwrites(&roles(Some(RoleId(9))));
        let everyone = everyone(&overwrites);
        assert!(everyone.allow.is_empty());
        assert!(everyone.denies(SendMessages));

        let verified = overwrites
            .iter()
            .find(|o| o.target == OverwriteTarget::Role(RoleId(9)))
            .unwrap();
        assert!(verified.allows(View));
        assert!(verified.deny.is_empty());
    }

    #[test]
    fn test_lobby_hidden_from_everyone() {
        let overwrites = lobby_overwrites(RoleId(5), RoleId(2));
        assert!(everyone(&overwrites).denies(View));
        assert!(overwrites.iter().any(|o| o.target == OverwriteTarget::Role(RoleId(5)) && o.allows(Connect)));
    }

    #[test]
    fn test_toggle_speak_flips_bit() {
        let base = Overwrite::new(OverwriteTarget::Role(RoleId(1))).allow([Connect, Speak]);
        let muted = toggle_speak(base, true);
        assert!(muted.denies(Speak));
        assert!(muted.allows(Connect));
        assert!(toggle_speak(muted, false).allows(Speak));
    }
}
