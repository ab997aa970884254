//! The command table.
//!
//! Each [`Rule`] declares a command name, how many arguments it takes
//! and of what shape, who may run it and where. The processor walks
//! [`RULES`] in order and stops at the first rule whose whole predicate
//! chain holds:
//!
//! 1. the message is not the bot's own and not empty,
//! 2. the name and arguments match ([`Rule::accept`]),
//! 3. the invoker is cleared for it ([`Clearance`]),
//! 4. it was posted in an allowed place ([`Scope`]).
//!
//! A failing step ends the evaluation of that rule without any reply.

use std::fmt;

use tourney_protocol::{Command, MemberRef, OVERRIDE_ARG};

/// Every command the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Prepare,
    Clean,
    Join,
    Quit,
    List,
    Start,
    End,
    Assign,
    Summon,
    Mute,
    Unmute,
    Bring,
    Kick,
    Ban,
    Unban,
    Promote,
    Demote,
    Broadcast,
    Terminate,
}

/// Which side of the session lock a command takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl CommandKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Prepare => "PREPARE",
            Self::Clean => "CLEAN",
            Self::Join => "JOIN",
            Self::Quit => "QUIT",
            Self::List => "LIST",
            Self::Start => "START",
            Self::End => "END",
            Self::Assign => "ASSIGN",
            Self::Summon => "SUMMON",
            Self::Mute => "MUTE",
            Self::Unmute => "UNMUTE",
            Self::Bring => "BRING",
            Self::Kick => "KICK",
            Self::Ban => "BAN",
            Self::Unban => "UNBAN",
            Self::Promote => "PROMOTE",
            Self::Demote => "DEMOTE",
            Self::Broadcast => "BROADCAST",
            Self::Terminate => "TERMINATE",
        }
    }

    /// Commands that only look at the session read. Everything else
    /// writes, for its whole run.
    pub fn access(self) -> Access {
        match self {
            Self::List | Self::Broadcast => Access::Read,
            _ => Access::Write,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive bounds on the argument count. `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl ArgRange {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

/// What the arguments must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    None,
    /// At most the override marker `+`.
    Override,
    /// Member ids or mentions.
    MemberRefs,
    /// A member followed by a lobby index.
    Assign,
    /// Free text, forwarded as typed.
    Text,
}

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// Anyone who resolves to a member of the guild.
    AnyMember,
    /// Administrators, managers and super-operators.
    Operator,
}

/// Where a command may be posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any guild channel or private conversation.
    Anywhere,
    /// Any guild text channel, but not a private conversation.
    AnyChannel,
    /// Only the operations channel.
    Operations,
    /// The operations channel or the invoker's private conversation.
    OperationsOrDirect,
}

/// Arguments after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    None,
    Override(bool),
    Members(Vec<MemberRef>),
    Assign { member: MemberRef, lobby: u32 },
    Text(String),
}

impl Args {
    pub fn has_override(&self) -> bool {
        matches!(self, Self::Override(true))
    }
}

/// One entry of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub kind: CommandKind,
    pub args: ArgRange,
    pub shape: ArgShape,
    pub clearance: Clearance,
    pub scope: Scope,
}

impl Rule {
    const fn operator(kind: CommandKind, args: ArgRange, shape: ArgShape) -> Self {
        Self {
            kind,
            args,
            shape,
            clearance: Clearance::Operator,
            scope: Scope::Operations,
        }
    }

    const fn member(kind: CommandKind, args: ArgRange, shape: ArgShape) -> Self {
        Self {
            kind,
            args,
            shape,
            clearance: Clearance::AnyMember,
            scope: Scope::OperationsOrDirect,
        }
    }

    const fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Name and argument predicate. Returns the parsed arguments when
    /// `command` is an invocation of this rule.
    pub fn accept(&self, command: &Command) -> Option<Args> {
        if command.name != self.kind.name() || !self.args.contains(command.args.len()) {
            return None;
        }
        let args = &command.args;
        match self.shape {
            ArgShape::None => Some(Args::None),
            ArgShape::Override => {
                if args.iter().all(|arg| arg == OVERRIDE_ARG) {
                    Some(Args::Override(command.has_override()))
                } else {
                    None
                }
            }
            ArgShape::MemberRefs => args
                .iter()
                .map(|arg| MemberRef::parse(arg).ok())
                .collect::<Option<Vec<_>>>()
                .map(Args::Members),
            ArgShape::Assign => match args.as_slice() {
                [member, lobby] => Some(Args::Assign {
                    member: MemberRef::parse(member).ok()?,
                    lobby: lobby.parse().ok()?,
                }),
                _ => None,
            },
            ArgShape::Text => Some(Args::Text(command.text_after_name().to_string())),
        }
    }
}

use ArgShape as S;
use CommandKind as K;

/// The full command table, in priority order.
pub const RULES: &[Rule] = &[
    Rule::operator(K::Terminate, ArgRange::exactly(0), S::None).in_scope(Scope::Anywhere),
    Rule::member(K::Join, ArgRange::exactly(0), S::None),
    Rule::member(K::Quit, ArgRange::exactly(0), S::None),
    Rule::member(K::List, ArgRange::between(0, 1), S::Override),
    Rule::operator(K::Start, ArgRange::between(0, 1), S::Override),
    Rule::operator(K::Assign, ArgRange::exactly(2), S::Assign),
    Rule::operator(K::End, ArgRange::exactly(0), S::None),
    Rule::operator(K::Summon, ArgRange::between(0, 1), S::Override),
    Rule::operator(K::Broadcast, ArgRange::at_least(1), S::Text),
    Rule::operator(K::Mute, ArgRange::exactly(0), S::None),
    Rule::operator(K::Unmute, ArgRange::exactly(0), S::None),
    Rule::operator(K::Bring, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Kick, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Promote, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Demote, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Ban, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Unban, ArgRange::at_least(1), S::MemberRefs),
    Rule::operator(K::Prepare, ArgRange::exactly(0), S::None).in_scope(Scope::AnyChannel),
    Rule::operator(K::Clean, ArgRange::exactly(0), S::None),
];

/// The rules replayed from the channel backlog at startup.
pub const BACKLOG_RULES: &[Rule] = &[
    Rule::member(K::Join, ArgRange::exactly(0), S::None),
    Rule::member(K::Quit, ArgRange::exactly(0), S::None),
];

#[cfg(test)]
mod tests {
    use super::*;
    use super::CommandKind as K;
    use tourney_protocol::{ChannelId, InboundMessage, MemberId, MessageId, Origin};

    fn command(content: &str) -> Command {
        Command::parse(&InboundMessage {
            id: MessageId(1),
            author: MemberId(9),
            origin: Origin::Channel(ChannelId(1)),
            content: content.to_string(),
        })
        .unwrap()
    }

    fn first(content: &str) -> Option<(CommandKind, Args)> {
        let cmd = command(content);
        RULES
            .iter()
            .find_map(|rule| rule.accept(&cmd).map(|args| (rule.kind, args)))
    }

    #[test]
    fn test_accept_is_case_insensitive() {
        assert_eq!(first("join"), Some((K::Join, Args::None)));
        assert_eq!(first("JoIn"), Some((K::Join, Args::None)));
    }

    #[test]
    fn test_accept_rejects_wrong_arg_count() {
        assert_eq!(first("join now"), None);
        assert_eq!(first("assign 5"), None);
        assert_eq!(first("summon + +"), None);
        assert_eq!(first("bring"), None);
        assert_eq!(first("broadcast"), None);
    }

    #[test]
    fn test_accept_override_only_takes_plus() {
        assert_eq!(first("summon +"), Some((K::Summon, Args::Override(true))));
        assert_eq!(first("summon"), Some((K::Summon, Args::Override(false))));
        assert_eq!(first("summon all"), None);
    }

    #[test]
    fn test_accept_member_refs_all_must_parse() {
        assert_eq!(
            first("kick 12 <@!34>"),
            Some((K::Kick, Args::Members(vec![MemberId(12).into(), MemberId(34).into()])))
        );
        assert_eq!(first("kick 12 bob"), None);
    }

    #[test]
    fn test_accept_assign_needs_member_and_index() {
        assert_eq!(
            first("assign <@5> 2"),
            Some((
                K::Assign,
                Args::Assign {
                    member: MemberId(5).into(),
                    lobby: 2
                }
            ))
        );
        assert_eq!(first("assign <@5> two"), None);
        assert_eq!(first("assign two 2"), None);
    }

    #[test]
    fn test_accept_broadcast_keeps_casing() {
        assert_eq!(
            first("broadcast Meet in Lobby 3"),
            Some((K::Broadcast, Args::Text("Meet in Lobby 3".into())))
        );
    }

    #[test]
    fn test_rules_have_unique_names() {
        for (i, rule) in RULES.iter().enumerate() {
            assert!(
                RULES[i + 1..].iter().all(|other| other.kind != rule.kind),
                "{} listed twice",
                rule.kind
            );
        }
        assert_eq!(RULES.len(), 19);
    }

    #[test]
    fn test_rule_table_clearance_and_scope() {
        for rule in RULES {
            match rule.kind {
                K::Join | K::Quit | K::List => {
                    assert_eq!(rule.clearance, Clearance::AnyMember);
                    assert_eq!(rule.scope, Scope::OperationsOrDirect);
                }
                K::Terminate => assert_eq!(rule.scope, Scope::Anywhere),
                K::Prepare => assert_eq!(rule.scope, Scope::AnyChannel),
                _ => {
                    assert_eq!(rule.clearance, Clearance::Operator);
                    assert_eq!(rule.scope, Scope::Operations);
                }
            }
        }
    }

    #[test]
    fn test_access_reads_only_for_listing_and_broadcast() {
        let readers: Vec<_> = RULES
            .iter()
            .filter(|r| r.kind.access() == Access::Read)
            .map(|r| r.kind)
            .collect();
        assert_eq!(readers, vec![K::List, K::Broadcast]);
        assert_eq!(K::Mute.access(), Access::Write);
        assert_eq!(K::Unmute.access(), Access::Write);
    }

    #[test]
    fn test_arg_range_unbounded() {
        assert!(ArgRange::at_least(1).contains(500));
        assert!(!ArgRange::at_least(1).contains(0));
        assert!(ArgRange::between(0, 1).contains(0));
        assert!(!ArgRange::exactly(2).contains(3));
    }
}
