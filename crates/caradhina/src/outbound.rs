//! Outbound command lines.
//!
//! Every builder returns a complete CRLF-terminated line. Parameters are cut
//! at their first CR or LF so text that came from the network can never smuggle
//! a second command onto the wire.

/// Truncate a parameter at its first line break.
///
/// ```
/// use caradhina::outbound::sanitize;
///
/// assert_eq!(sanitize("hello\r\nQUIT :pwned"), "hello");
/// assert_eq!(sanitize("clean"), "clean");
/// ```
pub fn sanitize(param: &str) -> &str {
    match param.find(['\r', '\n']) {
        Some(pos) => &param[..pos],
        None => param,
    }
}

/// Assemble `<VERB> <middle...> [:<trailing>]\r\n`.
fn write_cmd(verb: &str, middle: &[&str], trailing: Option<&str>) -> String {
    let mut line = String::from(verb);
    for param in middle {
        line.push(' ');
        line.push_str(sanitize(param));
    }
    if let Some(text) = trailing {
        line.push_str(" :");
        line.push_str(sanitize(text));
    }
    line.push_str("\r\n");
    line
}

/// `NICK <nick>`
pub fn nick(nick: &str) -> String {
    write_cmd("NICK", &[nick], None)
}

/// `USER <nick> <nick> <nick> <nick>`
pub fn user(nick: &str) -> String {
    write_cmd("USER", &[nick, nick, nick, nick], None)
}

/// `JOIN <channel>`
pub fn join(channel: &str) -> String {
    write_cmd("JOIN", &[channel], None)
}

/// `PART <channel>`
pub fn part(channel: &str) -> String {
    write_cmd("PART", &[channel], None)
}

/// `PRIVMSG <target> :<message>`
pub fn privmsg(target: &str, message: &str) -> String {
    write_cmd("PRIVMSG", &[target], Some(message))
}

/// `NOTICE <target> :<message>`
pub fn notice(target: &str, message: &str) -> String {
    write_cmd("NOTICE", &[target], Some(message))
}

/// `QUIT :<message>`
pub fn quit(message: &str) -> String {
    write_cmd("QUIT", &[], Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_lines() {
        assert_eq!(nick("hanezeve"), "NICK hanezeve\r\n");
        assert_eq!(
            user("hanezeve"),
            "USER hanezeve hanezeve hanezeve hanezeve\r\n"
        );
    }

    #[test]
    fn test_channel_lines() {
        assert_eq!(join("#paratest"), "JOIN #paratest\r\n");
        assert_eq!(part("#paratest"), "PART #paratest\r\n");
    }

    #[test]
    fn test_trailing_lines() {
        assert_eq!(
            privmsg("#chan", "Hello alice!"),
            "PRIVMSG #chan :Hello alice!\r\n"
        );
        assert_eq!(notice("alice", ""), "NOTICE alice :\r\n");
        assert_eq!(quit("Leaving"), "QUIT :Leaving\r\n");
    }

    #[test]
    fn test_injection_is_truncated() {
        assert_eq!(
            privmsg("#chan", "hi\r\nQUIT :gotcha"),
            "PRIVMSG #chan :hi\r\n"
        );
        assert_eq!(privmsg("#chan\nJOIN #evil", "x"), "PRIVMSG #chan :x\r\n");
        assert_eq!(sanitize("a\rb"), "a");
    }
}
