//! Bot behaviours, each a handler subscribed to PRIVMSG.
//!
//! Handlers run in the order they are registered here. The shy handler
//! goes last so anything the others reply is written before the QUIT.

mod commands;
mod ctcp;
mod greeting;

pub use commands::{PingCommandHandler, ShyHandler, StopHandler};
pub use ctcp::CtcpHandler;
pub use greeting::GreetingHandler;

use crate::config::BotConfig;
use caradhina::{CommandKind, Context, Dispatcher, Event};
use tracing::debug;

/// Subscribe every behaviour the configuration asks for.
pub fn register(
    dispatcher: &mut Dispatcher,
    bot: &BotConfig,
    quit_message: &str,
) -> Result<(), regex::Error> {
    let privmsg = &[CommandKind::Privmsg];

    dispatcher.subscribe(privmsg, GreetingHandler::new(&bot.nick)?);
    dispatcher.subscribe(privmsg, CtcpHandler::new());
    dispatcher.subscribe(privmsg, PingCommandHandler);
    dispatcher.subscribe(
        privmsg,
        StopHandler::new(bot.stop_command.clone(), bot.admin.clone(), quit_message),
    );
    if bot.shy {
        dispatcher.subscribe(privmsg, ShyHandler::new(quit_message));
    }

    debug!(shy = bot.shy, "behaviours registered");
    Ok(())
}

/// Where to answer a message sent to `target`: the channel itself when the
/// bot is in it, otherwise the sender.
pub(crate) fn reply_target<'a>(ctx: &Context<'_>, event: &'a Event, target: &'a str) -> &'a str {
    if ctx.channel(target).is_some() {
        target
    } else {
        event.source_nick()
    }
}
