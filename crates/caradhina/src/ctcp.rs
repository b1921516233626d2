//! CTCP bodies carried inside PRIVMSG and NOTICE.
//!
//! A CTCP body is framed by `\x01`: `\x01VERSION\x01`,
//! `\x01PING 1700000000\x01`. Requests arrive in PRIVMSG, replies go out
//! in NOTICE.
//!
//! ```
//! use caradhina::ctcp::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01PING 12345\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Ping);
//! assert_eq!(ctcp.params, Some("12345"));
//!
//! assert_eq!(Ctcp::reply(CtcpKind::Ping, "12345").to_string(), "\x01PING 12345\x01");
//! ```

use std::fmt;

const DELIM: char = '\x01';

/// CTCP verbs the bot cares about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// `/me` actions.
    Action,
    /// Client version query.
    Version,
    /// Round-trip timing request; the reply echoes the parameter.
    Ping,
    /// Local time query.
    Time,
    /// Supported-verbs query.
    Clientinfo,
    /// Anything else, kept verbatim.
    Unknown(String),
}

impl CtcpKind {
    /// Look up a verb, ignoring case.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "TIME" => Self::Time,
            "CLIENTINFO" => Self::Clientinfo,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Canonical upper-case verb.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Clientinfo => "CLIENTINFO",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CTCP body, borrowing its parameters from the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The verb.
    pub kind: CtcpKind,
    /// Text after the verb; `None` when absent or empty.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a message body. Returns `None` unless it starts with `\x01`.
    ///
    /// The closing `\x01` is optional; some clients drop it.
    pub fn parse(body: &'a str) -> Option<Self> {
        let inner = body.strip_prefix(DELIM)?;
        let inner = inner.strip_suffix(DELIM).unwrap_or(inner);
        if inner.is_empty() {
            return None;
        }

        let (verb, params) = match inner.split_once(' ') {
            Some((verb, rest)) => (verb, Some(rest).filter(|r| !r.is_empty())),
            None => (inner, None),
        };
        Some(Self {
            kind: CtcpKind::parse(verb),
            params,
        })
    }

    /// Whether `body` looks like a CTCP body at all.
    #[inline]
    pub fn is_ctcp(body: &str) -> bool {
        body.starts_with(DELIM)
    }

    /// A request without parameters, e.g. `\x01VERSION\x01`.
    pub fn request(kind: CtcpKind) -> Self {
        Self { kind, params: None }
    }

    /// A request or reply carrying `params`.
    pub fn reply(kind: CtcpKind, params: &'a str) -> Self {
        Self {
            kind,
            params: Some(params),
        }
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DELIM}{}", self.kind)?;
        if let Some(params) = self.params {
            write!(f, " {params}")?;
        }
        write!(f, "{DELIM}")
    }
}
