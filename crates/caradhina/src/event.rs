//! Typed events parsed from protocol lines.
//!
//! An [`Event`] is built once per received line by [`parse`](crate::parse)
//! and is immutable afterwards. The command-specific fields live in
//! [`EventKind`]; the closed set of command kinds that listeners can
//! subscribe to is [`CommandKind`].

use std::fmt;

/// The closed set of commands listeners can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandKind {
    /// NOTICE
    Notice,
    /// JOIN
    Join,
    /// QUIT
    Quit,
    /// PART
    Part,
    /// NICK
    Nick,
    /// MODE
    Mode,
    /// KICK
    Kick,
    /// PRIVMSG
    Privmsg,
    /// INVITE
    Invite,
    /// TOPIC
    Topic,
    /// ERROR
    Error,
    /// Any three-digit numeric reply.
    Numeric,
    /// Any command outside this set, PING included.
    Unrecognized,
}

impl CommandKind {
    /// Every command kind, in declaration order.
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Notice,
        CommandKind::Join,
        CommandKind::Quit,
        CommandKind::Part,
        CommandKind::Nick,
        CommandKind::Mode,
        CommandKind::Kick,
        CommandKind::Privmsg,
        CommandKind::Invite,
        CommandKind::Topic,
        CommandKind::Error,
        CommandKind::Numeric,
        CommandKind::Unrecognized,
    ];

    /// Look up a command verb. Matching is exact and case-sensitive.
    ///
    /// Returns `None` for numerics and unknown verbs.
    pub fn from_verb(verb: &str) -> Option<Self> {
        Some(match verb {
            "NOTICE" => Self::Notice,
            "JOIN" => Self::Join,
            "QUIT" => Self::Quit,
            "PART" => Self::Part,
            "NICK" => Self::Nick,
            "MODE" => Self::Mode,
            "KICK" => Self::Kick,
            "PRIVMSG" => Self::Privmsg,
            "INVITE" => Self::Invite,
            "TOPIC" => Self::Topic,
            "ERROR" => Self::Error,
            _ => return None,
        })
    }

    /// Canonical name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notice => "NOTICE",
            Self::Join => "JOIN",
            Self::Quit => "QUIT",
            Self::Part => "PART",
            Self::Nick => "NICK",
            Self::Mode => "MODE",
            Self::Kick => "KICK",
            Self::Privmsg => "PRIVMSG",
            Self::Invite => "INVITE",
            Self::Topic => "TOPIC",
            Self::Error => "ERROR",
            Self::Numeric => "NUMERIC",
            Self::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command-specific fields of an event.
///
/// Field names follow the wire grammar shown on each variant.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// `NOTICE <target> :<message>`
    Notice { target: String, message: String },
    /// `JOIN <channel>`
    Join { channel: String },
    /// `QUIT :<reason>`
    Quit { reason: String },
    /// `PART <channel> [:<reason>]`; `reason` is empty when absent.
    Part { channel: String, reason: String },
    /// `NICK <nick>`: the source's new nickname.
    Nick { nick: String },
    /// `MODE <channel> <modes> [<param>]`
    Mode {
        channel: String,
        modes: String,
        param: Option<String>,
    },
    /// `KICK <channel> <nick> :<reason>`
    Kick {
        channel: String,
        nick: String,
        reason: String,
    },
    /// `PRIVMSG <target> :<message>`
    Privmsg { target: String, message: String },
    /// `INVITE <target> :<channel>`
    Invite { target: String, channel: String },
    /// `TOPIC <channel> :<topic>`
    Topic { channel: String, topic: String },
    /// `ERROR :<message>`
    Error { message: String },
    /// `<code> <target> :<message>`
    Numeric {
        code: u16,
        target: String,
        message: String,
    },
    /// Any other command, with its parameters left unparsed.
    Unrecognized { command: String, params: String },
}

impl EventKind {
    /// The subscription key for this event.
    pub fn command(&self) -> CommandKind {
        match self {
            Self::Notice { .. } => CommandKind::Notice,
            Self::Join { .. } => CommandKind::Join,
            Self::Quit { .. } => CommandKind::Quit,
            Self::Part { .. } => CommandKind::Part,
            Self::Nick { .. } => CommandKind::Nick,
            Self::Mode { .. } => CommandKind::Mode,
            Self::Kick { .. } => CommandKind::Kick,
            Self::Privmsg { .. } => CommandKind::Privmsg,
            Self::Invite { .. } => CommandKind::Invite,
            Self::Topic { .. } => CommandKind::Topic,
            Self::Error { .. } => CommandKind::Error,
            Self::Numeric { .. } => CommandKind::Numeric,
            Self::Unrecognized { .. } => CommandKind::Unrecognized,
        }
    }
}

/// One parsed protocol line.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// The line as received, without its terminator.
    pub raw_line: String,
    /// Origin of the line with the leading colon removed; empty if absent.
    pub source: String,
    /// Command-specific fields.
    pub kind: EventKind,
}

impl Event {
    /// The subscription key for this event.
    #[inline]
    pub fn command(&self) -> CommandKind {
        self.kind.command()
    }

    /// Nickname part of the source (everything before the first `!`).
    ///
    /// For a server source this is the whole server name.
    pub fn source_nick(&self) -> &str {
        source_nick(&self.source)
    }
}

/// Nickname part of a `nick!user@host` source.
pub fn source_nick(source: &str) -> &str {
    source.split('!').next().unwrap_or(source)
}
