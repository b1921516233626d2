//! Bang commands and the shy switch.

use super::reply_target;
use caradhina::channel::fold;
use caradhina::ctcp::{Ctcp, CtcpKind};
use caradhina::{Context, Event, EventKind, Flow, Handler};
use tracing::{info, warn};

/// `!ping`: sends the requester a CTCP PING stamped with the current time.
pub struct PingCommandHandler;

impl Handler for PingCommandHandler {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let EventKind::Privmsg { message, .. } = &event.kind else {
            return Flow::Continue;
        };

        if message.trim_end() == "!ping" {
            let stamp = chrono::Utc::now().timestamp().to_string();
            let body = Ctcp::reply(CtcpKind::Ping, &stamp).to_string();
            ctx.send_message(event.source_nick(), &body);
        }
        Flow::Continue
    }
}

/// Stop command: says goodbye and quits when the sender is the admin or
/// an operator of the channel it was said in.
pub struct StopHandler {
    command: String,
    admin: Option<String>,
    quit_message: String,
}

impl StopHandler {
    pub fn new(command: String, admin: Option<String>, quit_message: &str) -> Self {
        Self {
            command,
            admin: admin.map(|a| fold(&a)),
            quit_message: quit_message.to_string(),
        }
    }

    fn is_authorized(&self, ctx: &Context<'_>, nick: &str, target: &str) -> bool {
        if self.admin.as_deref() == Some(fold(nick).as_str()) {
            return true;
        }
        ctx.channel(target).is_some_and(|channel| channel.has_mode(nick, 'o'))
    }
}

impl Handler for StopHandler {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let EventKind::Privmsg { target, message } = &event.kind else {
            return Flow::Continue;
        };
        if message.trim_end() != self.command {
            return Flow::Continue;
        }

        let nick = event.source_nick();
        if !self.is_authorized(ctx, nick, target) {
            warn!(nick, target = %target, "unauthorized stop request");
            return Flow::Continue;
        }

        info!(nick, "stop requested");
        let to = reply_target(ctx, event, target);
        ctx.send_message(to, "Bye!");
        ctx.quit(&self.quit_message);
        Flow::Unbind
    }
}

/// Leaves on the first private or channel message.
pub struct ShyHandler {
    quit_message: String,
}

impl ShyHandler {
    pub fn new(quit_message: &str) -> Self {
        Self {
            quit_message: quit_message.to_string(),
        }
    }
}

impl Handler for ShyHandler {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        info!(from = event.source_nick(), "spoken to, leaving");
        ctx.quit(&self.quit_message);
        Flow::Unbind
    }
}
