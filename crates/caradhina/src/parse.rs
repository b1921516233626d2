//! Line parsing.
//!
//! Turns one complete protocol line into an [`Event`]. Parsing is
//! deliberately forgiving about unknown commands (they become
//! [`EventKind::Unrecognized`]) and strict about the parameter layout of the
//! commands it does know: a KICK without a reason, for instance, is a
//! [`ParseError`] for that line only.

use crate::error::ParseError;
use crate::event::{Event, EventKind};

/// Remove a single leading colon, if present.
///
/// ```
/// use caradhina::parse::trim_colon;
///
/// assert_eq!(trim_colon(":hello"), "hello");
/// assert_eq!(trim_colon("::x"), ":x");
/// assert_eq!(trim_colon("plain"), "plain");
/// ```
#[inline]
pub fn trim_colon(s: &str) -> &str {
    s.strip_prefix(':').unwrap_or(s)
}

/// A first token that is fully alphanumeric and fully uppercase is a command,
/// not a source: `PING :x`, `ERROR :Closing link`.
fn is_bare_command(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(char::is_alphanumeric)
        && token.chars().any(char::is_uppercase)
        && !token.chars().any(char::is_lowercase)
}

/// Split on the first space. The remainder is `None` if there is no space.
fn split_first(s: &str) -> (&str, Option<&str>) {
    match s.split_once(' ') {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    }
}

/// Split `params` into exactly `N` space-separated fields, the last one
/// taking the remainder of the line.
fn fields<'a, const N: usize>(
    command: &'static str,
    params: &'a str,
) -> Result<[&'a str; N], ParseError> {
    let mut out = [""; N];
    let mut got = 0;
    if !params.is_empty() {
        for (slot, field) in out.iter_mut().zip(params.splitn(N, ' ')) {
            *slot = field;
            got += 1;
        }
    }

    if got < N {
        return Err(ParseError::NotEnoughParams {
            command,
            expected: N,
            got,
        });
    }
    Ok(out)
}

/// First token of `params` with a leading colon removed, required non-empty.
fn single(command: &'static str, params: &str) -> Result<String, ParseError> {
    let [token] = fields::<1>(command, split_first(params).0)?;
    Ok(trim_colon(token).to_owned())
}

/// Parse one line into an event.
///
/// A trailing CR/LF is ignored. The line is split into an optional source,
/// the command, and the remaining parameters, which are then split according
/// to the command's grammar.
///
/// ```
/// use caradhina::{parse, EventKind};
///
/// let event = parse(":nick!user@host PRIVMSG #chan :text").unwrap();
/// assert_eq!(event.source, "nick!user@host");
/// assert_eq!(
///     event.kind,
///     EventKind::Privmsg { target: "#chan".into(), message: "text".into() }
/// );
/// ```
pub fn parse(line: &str) -> Result<Event, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let (first, rest) = split_first(line);
    let (source, command, params) = if !first.starts_with(':') && is_bare_command(first) {
        ("", first, rest.unwrap_or(""))
    } else {
        let (command, params) = split_first(rest.unwrap_or(""));
        if command.is_empty() {
            return Err(ParseError::MissingCommand(first.to_owned()));
        }
        (trim_colon(first), command, params.unwrap_or(""))
    };

    let kind = parse_params(command, params)?;

    Ok(Event {
        raw_line: line.to_owned(),
        source: source.to_owned(),
        kind,
    })
}

/// Split `params` by the grammar of `command`. Verbs outside the closed
/// set go to [`parse_other`].
fn parse_params(command: &str, params: &str) -> Result<EventKind, ParseError> {
    let event = match command {
        "NOTICE" => {
            let [target, message] = fields("NOTICE", params)?;
            EventKind::Notice {
                target: target.to_owned(),
                message: trim_colon(message).to_owned(),
            }
        }
        "PRIVMSG" => {
            let [target, message] = fields("PRIVMSG", params)?;
            EventKind::Privmsg {
                target: target.to_owned(),
                message: trim_colon(message).to_owned(),
            }
        }
        "JOIN" => EventKind::Join {
            channel: single("JOIN", params)?,
        },
        "NICK" => EventKind::Nick {
            nick: single("NICK", params)?,
        },
        "QUIT" => EventKind::Quit {
            reason: trim_colon(params).to_owned(),
        },
        "ERROR" => EventKind::Error {
            message: trim_colon(params).to_owned(),
        },
        "PART" => {
            let [channel] = fields::<1>("PART", params)?;
            let (channel, reason) = split_first(channel);
            EventKind::Part {
                channel: channel.to_owned(),
                reason: trim_colon(reason.unwrap_or("")).to_owned(),
            }
        }
        "KICK" => {
            let [channel, nick, reason] = fields("KICK", params)?;
            EventKind::Kick {
                channel: channel.to_owned(),
                nick: nick.to_owned(),
                reason: trim_colon(reason).to_owned(),
            }
        }
        "TOPIC" => {
            let [channel, topic] = fields("TOPIC", params)?;
            EventKind::Topic {
                channel: channel.to_owned(),
                topic: trim_colon(topic).to_owned(),
            }
        }
        "INVITE" => {
            let [target, channel] = fields("INVITE", params)?;
            EventKind::Invite {
                target: target.to_owned(),
                channel: trim_colon(channel).to_owned(),
            }
        }
        "MODE" => match fields::<3>("MODE", params) {
            Ok([channel, modes, param]) => EventKind::Mode {
                channel: channel.to_owned(),
                modes: modes.to_owned(),
                param: Some(trim_colon(param).to_owned()),
            },
            Err(_) => {
                let [channel, modes] = fields("MODE", params)?;
                EventKind::Mode {
                    channel: channel.to_owned(),
                    modes: trim_colon(modes).to_owned(),
                    param: None,
                }
            }
        },
        _ => parse_other(command, params)?,
    };
    Ok(event)
}

/// Numeric replies and everything outside the closed command set.
fn parse_other(command: &str, params: &str) -> Result<EventKind, ParseError> {
    let code = command
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| command.parse::<u16>().ok())
        .flatten();

    match code {
        Some(code) => {
            let [target, message] = fields("NUMERIC", params)?;
            Ok(EventKind::Numeric {
                code,
                target: target.to_owned(),
                message: trim_colon(message).to_owned(),
            })
        }
        None => {
            tracing::debug!(command, params, "unrecognized command");
            Ok(EventKind::Unrecognized {
                command: command.to_owned(),
                params: params.to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CommandKind;

    fn kind(line: &str) -> EventKind {
        parse(line).unwrap().kind
    }

    #[test]
    fn test_parse_privmsg() {
        let event = parse(":nick!user@host PRIVMSG #chan :Hello, world!\r\n").unwrap();
        assert_eq!(event.source, "nick!user@host");
        assert_eq!(event.command(), CommandKind::Privmsg);
        assert_eq!(
            event.kind,
            EventKind::Privmsg {
                target: "#chan".into(),
                message: "Hello, world!".into(),
            }
        );
        assert_eq!(
            event.raw_line,
            ":nick!user@host PRIVMSG #chan :Hello, world!"
        );
    }

    #[test]
    fn test_parse_notice_without_source() {
        let event = parse("NOTICE AUTH :*** Looking up your hostname...").unwrap();
        assert_eq!(event.source, "");
        assert_eq!(
            event.kind,
            EventKind::Notice {
                target: "AUTH".into(),
                message: "*** Looking up your hostname...".into(),
            }
        );
    }

    #[test]
    fn test_parse_ping_is_unrecognized() {
        let event = parse("PING :irc.example.net").unwrap();
        assert_eq!(event.source, "");
        assert_eq!(
            event.kind,
            EventKind::Unrecognized {
                command: "PING".into(),
                params: ":irc.example.net".into(),
            }
        );
    }

    #[test]
    fn test_source_without_colon() {
        let event = parse("irc.example.net NOTICE * :hi").unwrap();
        assert_eq!(event.source, "irc.example.net");
        assert_eq!(event.command(), CommandKind::Notice);
    }

    #[test]
    fn test_parse_join() {
        assert_eq!(
            kind(":alice!a@h JOIN :#chan"),
            EventKind::Join {
                channel: "#chan".into(),
            }
        );
        assert_eq!(
            kind(":alice!a@h JOIN #chan account :Real Name"),
            EventKind::Join {
                channel: "#chan".into(),
            }
        );
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(
            kind(":alice!a@h QUIT :Ping timeout: 240 seconds"),
            EventKind::Quit {
                reason: "Ping timeout: 240 seconds".into(),
            }
        );
        assert_eq!(
            kind(":alice!a@h QUIT"),
            EventKind::Quit { reason: "".into() }
        );
    }

    #[test]
    fn test_parse_part() {
        assert_eq!(
            kind(":alice!a@h PART #chan :bye now"),
            EventKind::Part {
                channel: "#chan".into(),
                reason: "bye now".into(),
            }
        );
        assert_eq!(
            kind(":alice!a@h PART #chan"),
            EventKind::Part {
                channel: "#chan".into(),
                reason: "".into(),
            }
        );
    }

    #[test]
    fn test_parse_nick() {
        assert_eq!(
            kind(":old!a@h NICK :new"),
            EventKind::Nick { nick: "new".into() }
        );
    }

    #[test]
    fn test_parse_mode_with_param() {
        assert_eq!(
            kind(":op!o@h MODE #chan +o alice"),
            EventKind::Mode {
                channel: "#chan".into(),
                modes: "+o".into(),
                param: Some("alice".into()),
            }
        );
        assert_eq!(
            kind(":op!o@h MODE #chan +ov alice bob"),
            EventKind::Mode {
                channel: "#chan".into(),
                modes: "+ov".into(),
                param: Some("alice bob".into()),
            }
        );
    }

    #[test]
    fn test_parse_mode_without_param() {
        assert_eq!(
            kind(":op!o@h MODE #chan +m"),
            EventKind::Mode {
                channel: "#chan".into(),
                modes: "+m".into(),
                param: None,
            }
        );
        assert_eq!(
            kind(":bot MODE bot :+i"),
            EventKind::Mode {
                channel: "bot".into(),
                modes: "+i".into(),
                param: None,
            }
        );
    }

    #[test]
    fn test_parse_kick() {
        assert_eq!(
            kind(":op!o@h KICK #chan bob :no spamming"),
            EventKind::Kick {
                channel: "#chan".into(),
                nick: "bob".into(),
                reason: "no spamming".into(),
            }
        );
    }

    #[test]
    fn test_parse_kick_without_reason_fails() {
        assert_eq!(
            parse(":op!o@h KICK #chan bob"),
            Err(ParseError::NotEnoughParams {
                command: "KICK",
                expected: 3,
                got: 2,
            })
        );
    }

    #[test]
    fn test_parse_topic_and_invite() {
        assert_eq!(
            kind(":op!o@h TOPIC #chan :new topic here"),
            EventKind::Topic {
                channel: "#chan".into(),
                topic: "new topic here".into(),
            }
        );
        assert_eq!(
            kind(":op!o@h INVITE bot :#secret"),
            EventKind::Invite {
                target: "bot".into(),
                channel: "#secret".into(),
            }
        );
    }

    #[test]
    fn test_parse_error() {
        let event = parse("ERROR :Closing Link: bot (Quit: Leaving)").unwrap();
        assert_eq!(event.source, "");
        assert_eq!(
            event.kind,
            EventKind::Error {
                message: "Closing Link: bot (Quit: Leaving)".into(),
            }
        );
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(
            kind(":irc.example.net 353 bot = #chan :@alice +bob charlie"),
            EventKind::Numeric {
                code: 353,
                target: "bot".into(),
                message: "= #chan :@alice +bob charlie".into(),
            }
        );
        assert_eq!(
            kind(":irc.example.net 001 bot :Welcome to the network"),
            EventKind::Numeric {
                code: 1,
                target: "bot".into(),
                message: "Welcome to the network".into(),
            }
        );
    }

    #[test]
    fn test_parse_unrecognized_with_source() {
        let event = parse(":irc.example.net CAP * LS :multi-prefix").unwrap();
        assert_eq!(event.source, "irc.example.net");
        assert_eq!(
            event.kind,
            EventKind::Unrecognized {
                command: "CAP".into(),
                params: "* LS :multi-prefix".into(),
            }
        );
    }

    #[test]
    fn test_every_closed_verb_has_its_kind() {
        let lines = [
            ":s NOTICE t :m",
            ":s JOIN #c",
            ":s QUIT :r",
            ":s PART #c",
            ":s NICK n",
            ":s MODE #c +o n",
            ":s KICK #c n :r",
            ":s PRIVMSG t :m",
            ":s INVITE n #c",
            ":s TOPIC #c :t",
            "ERROR :closing",
        ];
        for line in lines {
            let event = parse(line).unwrap();
            let verb = if event.source.is_empty() {
                line.split(' ').next().unwrap()
            } else {
                line.split(' ').nth(1).unwrap()
            };
            assert_eq!(
                CommandKind::from_verb(verb),
                Some(event.command()),
                "{line}"
            );
        }
    }

    #[test]
    fn test_lowercase_verb_is_unrecognized() {
        assert_eq!(
            kind(":a!b@c privmsg #chan :hi"),
            EventKind::Unrecognized {
                command: "privmsg".into(),
                params: "#chan :hi".into(),
            }
        );
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse(""), Err(ParseError::EmptyLine));
        assert_eq!(parse("  \r\n"), Err(ParseError::EmptyLine));
        assert_eq!(
            parse(":lonely.source"),
            Err(ParseError::MissingCommand(":lonely.source".into()))
        );
        assert!(matches!(
            parse(":a!b@c PRIVMSG #chan"),
            Err(ParseError::NotEnoughParams {
                command: "PRIVMSG",
                ..
            })
        ));
        assert!(matches!(
            parse(":a!b@c JOIN"),
            Err(ParseError::NotEnoughParams {
                command: "JOIN",
                got: 0,
                ..
            })
        ));
        assert!(matches!(
            parse(":a!b@c MODE #chan"),
            Err(ParseError::NotEnoughParams {
                command: "MODE",
                expected: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_message_keeps_inner_colons() {
        assert_eq!(
            kind(":a!b@c PRIVMSG #chan ::) hi: there"),
            EventKind::Privmsg {
                target: "#chan".into(),
                message: ":) hi: there".into(),
            }
        );
    }
}
