//! Answers CTCP VERSION and PING requests.

use caradhina::ctcp::{Ctcp, CtcpKind};
use caradhina::{Context, Event, EventKind, Flow, Handler};
use tracing::debug;

/// Replies to CTCP requests with a NOTICE to the requester.
pub struct CtcpHandler {
    version: String,
}

impl CtcpHandler {
    pub fn new() -> Self {
        Self {
            version: format!("hanezeve {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for CtcpHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for CtcpHandler {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let EventKind::Privmsg { message, .. } = &event.kind else {
            return Flow::Continue;
        };
        let Some(request) = Ctcp::parse(message) else {
            return Flow::Continue;
        };

        let reply = match (&request.kind, request.params) {
            (CtcpKind::Version, _) => Ctcp::reply(CtcpKind::Version, &self.version),
            (CtcpKind::Ping, Some(token)) => Ctcp::reply(CtcpKind::Ping, token),
            (kind, _) => {
                debug!(%kind, from = event.source_nick(), "ignoring CTCP request");
                return Flow::Continue;
            }
        };
        ctx.send_notice(event.source_nick(), &reply.to_string());
        Flow::Continue
    }
}
