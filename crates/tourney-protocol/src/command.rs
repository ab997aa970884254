//! Command grammar: turning a message body into a name and arguments.
//!
//! A body is split on whitespace and every token is upper-cased. The
//! first token is the command name, the rest are arguments. The
//! original text is kept so commands like BROADCAST can forward it
//! with its casing intact.

use std::fmt;

use crate::{InboundMessage, MemberId, MessageId, Origin, ProtocolError};

/// Argument that selects the "include normally-excluded members" variant.
pub const OVERRIDE_ARG: &str = "+";

/// A parsed command together with who sent it and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Upper-cased command name (the first token).
    pub name: String,
    /// Upper-cased remaining tokens, in order.
    pub args: Vec<String>,
    pub invoker: MemberId,
    pub origin: Origin,
    pub message: MessageId,
    raw: String,
}

impl Command {
    /// Tokenizes a message. Returns `None` for an empty or
    /// whitespace-only body.
    pub fn parse(msg: &InboundMessage) -> Option<Self> {
        let mut tokens = msg.content.split_whitespace().map(str::to_uppercase);
        let name = tokens.next()?;
        Some(Self {
            name,
            args: tokens.collect(),
            invoker: msg.author,
            origin: msg.origin,
            message: msg.id,
            raw: msg.content.clone(),
        })
    }

    /// The original body after the command name, casing preserved.
    pub fn text_after_name(&self) -> &str {
        let body = self.raw.trim_start();
        match body.find(char::is_whitespace) {
            Some(end) => body[end..].trim_start(),
            None => "",
        }
    }

    /// `true` when the last argument is the override marker `+`.
    pub fn has_override(&self) -> bool {
        self.args.last().is_some_and(|arg| arg == OVERRIDE_ARG)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Something that identifies a member in command arguments: a raw id
/// (`123`) or a mention (`<@123>` / `<@!123>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef(pub MemberId);

impl MemberRef {
    /// Parses an argument into a member reference.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMemberRef`] when the token is neither a
    /// number nor a mention wrapping a number.
    pub fn parse(token: &str) -> Result<Self, ProtocolError> {
        let digits = token
            .strip_prefix("<@")
            .and_then(|rest| rest.strip_suffix('>'))
            .map(|inner| inner.strip_prefix('!').unwrap_or(inner))
            .unwrap_or(token);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidMemberRef(token.to_string()));
        }
        digits
            .parse::<u64>()
            .map(|id| Self(MemberId(id)))
            .map_err(|_| ProtocolError::InvalidMemberRef(token.to_string()))
    }

    pub fn id(&self) -> MemberId {
        self.0
    }
}

impl From<MemberId> for MemberRef {
    fn from(id: MemberId) -> Self {
        Self(id)
    }
}
