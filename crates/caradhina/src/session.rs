//! Client-side session state.
//!
//! The [`Session`] is everything about the connection that handlers may
//! read or change: the bot's own nickname, the channels it is in, and the
//! queue of outbound lines waiting to be written to the socket.

use std::collections::{HashMap, VecDeque};

use crate::channel::{fold, Channel};
use crate::dispatch::{Context, Flow, Handler};
use crate::event::{Event, EventKind};
use crate::outbound;

/// State shared between the connection and its handlers.
#[derive(Debug)]
pub struct Session {
    nick: String,
    pub(crate) channels: HashMap<String, Channel>,
    outbox: VecDeque<String>,
    quitting: bool,
}

impl Session {
    /// Create a session for a bot using `nick`.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            channels: HashMap::new(),
            outbox: VecDeque::new(),
            quitting: false,
        }
    }

    /// The bot's current nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Whether `nick` is the bot's own nickname, ignoring case.
    pub fn is_me(&self, nick: &str) -> bool {
        fold(nick) == fold(&self.nick)
    }

    /// Look up a joined channel, case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&fold(name))
    }

    /// All channels currently tracked.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Queue a complete, already terminated line for writing.
    pub fn send_raw(&mut self, line: String) {
        self.outbox.push_back(line);
    }

    /// Queue `PRIVMSG <target> :<message>`.
    pub fn send_message(&mut self, target: &str, message: &str) {
        self.send_raw(outbound::privmsg(target, message));
    }

    /// Queue `NOTICE <target> :<message>`.
    pub fn send_notice(&mut self, target: &str, message: &str) {
        self.send_raw(outbound::notice(target, message));
    }

    /// Queue `QUIT :<message>` and mark the session as finished.
    ///
    /// Only the first call queues a QUIT.
    pub fn quit(&mut self, message: &str) {
        if !self.quitting {
            self.send_raw(outbound::quit(message));
            self.quitting = true;
        }
    }

    /// Whether [`quit`](Self::quit) has been called.
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Number of lines waiting to be written.
    pub fn pending_outbound(&self) -> usize {
        self.outbox.len()
    }

    /// Drain every queued outbound line.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.outbox.drain(..).collect()
    }

    pub(crate) fn pop_outbound(&mut self) -> Option<String> {
        self.outbox.pop_front()
    }
}

/// Follows NICK changes of the bot itself.
///
/// Subscribed before any channel listener so channels see the new nick
/// when they compare KICK targets.
pub(crate) struct OwnNickTracker;

impl Handler for OwnNickTracker {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        if let EventKind::Nick { nick } = &event.kind {
            if ctx.session.is_me(event.source_nick()) {
                tracing::info!(old = %ctx.session.nick, new = %nick, "own nick changed");
                ctx.session.nick = nick.clone();
            }
        }
        Flow::Continue
    }
}
