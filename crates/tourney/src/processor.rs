//! Dispatch: matching a message against the rule table.
//!
//! [`RuleProcessor::run`] evaluates one message at a time. The gate
//! mutex makes the matching phase strictly sequential in arrival order;
//! the matched command then runs on its own task so a slow bulk command
//! does not hold up the next message. Session safety comes from the
//! session lock taken inside the command, not from the gate.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tourney_platform::{Platform, RosterStore};
use tourney_protocol::{Command, InboundMessage, MemberId, Origin};
use tourney_session::SessionResources;

use crate::bot::BotState;
use crate::handlers;
use crate::rules::{Args, Clearance, Rule, Scope};

/// A command that passed every predicate of its rule.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub rule: &'static Rule,
    pub args: Args,
    pub command: Command,
}

/// What [`RuleProcessor::run`] did with a message.
#[derive(Debug)]
pub enum Dispatch {
    /// No rule matched. Nothing was sent back.
    Ignored,
    /// A rule matched; its command runs on this task.
    Spawned(JoinHandle<()>),
}

impl Dispatch {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    /// Waits for the spawned command, if there is one.
    pub async fn finish(self) {
        if let Self::Spawned(handle) = self {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "command task failed");
            }
        }
    }
}

/// Drives inbound messages through an ordered rule table.
pub struct RuleProcessor<P, R> {
    state: Arc<BotState<P, R>>,
    rules: &'static [Rule],
    gate: Mutex<()>,
}

impl<P: Platform, R: RosterStore> RuleProcessor<P, R> {
    pub(crate) fn new(state: Arc<BotState<P, R>>, rules: &'static [Rule]) -> Self {
        Self {
            state,
            rules,
            gate: Mutex::new(()),
        }
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Matches `message` and spawns the first matching command.
    pub async fn run(&self, message: InboundMessage) -> Dispatch {
        let _gate = self.gate.lock().await;

        if let Origin::Direct(_) = message.origin {
            tracing::info!(author = %message.author, content = %message.content, "direct message");
        }

        let Some(invocation) = self.evaluate(&message).await else {
            return Dispatch::Ignored;
        };
        tracing::debug!(
            command = %invocation.rule.kind,
            invoker = %invocation.command.invoker,
            "command matched"
        );
        let state = Arc::clone(&self.state);
        Dispatch::Spawned(tokio::spawn(handlers::execute(state, invocation)))
    }

    /// Runs the predicate chain of every rule in order and returns the
    /// first full match.
    pub async fn evaluate(&self, message: &InboundMessage) -> Option<Invocation> {
        if message.author == self.state.platform.bot_id() {
            return None;
        }
        let command = Command::parse(message)?;

        for rule in self.rules {
            let Some(args) = rule.accept(&command) else {
                continue;
            };
            if !self.cleared(rule.clearance, command.invoker).await {
                tracing::debug!(command = %rule.kind, invoker = %command.invoker, "invoker not cleared");
                continue;
            }
            if !self.in_scope(rule.scope, command.origin, command.invoker) {
                tracing::debug!(command = %rule.kind, origin = %command.origin, "posted out of scope");
                continue;
            }
            return Some(Invocation {
                rule,
                args,
                command,
            });
        }
        None
    }

    fn resources(&self) -> Option<Arc<SessionResources>> {
        self.state.resources.borrow().clone()
    }

    async fn cleared(&self, clearance: Clearance, invoker: MemberId) -> bool {
        let profile = match self.state.platform.resolve_member(invoker.into()).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(%invoker, error = %e, "failed to resolve invoker");
                return false;
            }
        };
        match clearance {
            Clearance::AnyMember => true,
            Clearance::Operator => {
                profile.administrator
                    || self.state.config.is_super_operator(invoker)
                    || self
                        .resources()
                        .is_some_and(|r| profile.has_role(r.manager_role))
            }
        }
    }

    fn in_scope(&self, scope: Scope, origin: Origin, invoker: MemberId) -> bool {
        let operations = || self.resources().map(|r| r.chat);
        match (scope, origin) {
            (Scope::Anywhere, _) => true,
            (Scope::AnyChannel, Origin::Channel(_)) => true,
            (Scope::Operations | Scope::OperationsOrDirect, Origin::Channel(channel)) => {
                operations() == Some(channel)
            }
            (Scope::OperationsOrDirect, Origin::Direct(member)) => member == invoker,
            (Scope::AnyChannel | Scope::Operations, Origin::Direct(_)) => false,
        }
    }
}
