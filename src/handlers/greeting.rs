//! Answers greetings addressed to the bot.

use super::reply_target;
use caradhina::{Context, Event, EventKind, Flow, Handler};
use regex::Regex;

const GREETINGS: &str = r"hi|hello|howdy|good (?:day|morning|afternoon|evening)";

/// Replies `Hello <name>!` to "hi hanezeve", "Good morning, hanezeve" and
/// the like.
pub struct GreetingHandler {
    pattern: Regex,
}

impl GreetingHandler {
    /// Build the matcher for greetings naming `nick`.
    pub fn new(nick: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?i)^(?:{GREETINGS})\W+{}\b",
            regex::escape(nick)
        ))?;
        Ok(Self { pattern })
    }

    fn is_greeting(&self, message: &str) -> bool {
        self.pattern.is_match(message.trim_end())
    }
}

impl Handler for GreetingHandler {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let EventKind::Privmsg { target, message } = &event.kind else {
            return Flow::Continue;
        };

        if self.is_greeting(message) {
            let name = event.source_nick();
            let to = reply_target(ctx, event, target);
            ctx.send_message(to, &format!("Hello {name}!"));
        }
        Flow::Continue
    }
}
