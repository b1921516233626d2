//! Event dispatch.
//!
//! The [`Dispatcher`] maps each [`CommandKind`] to an ordered list of
//! subscriptions. Subscribing returns a [`SubscriptionId`] that is the only
//! handle needed to unsubscribe later. A handler can also remove itself by
//! returning [`Flow::Unbind`].
//!
//! Handlers receive a [`Context`] giving them the [`Session`] (own nick,
//! joined channels, outbound queue) and the dispatcher itself, so a handler
//! may subscribe or unsubscribe other handlers while it runs.
//!
//! # Example
//!
//! ```
//! use caradhina::{handler_fn, parse, CommandKind, Dispatcher, Flow, Session};
//!
//! let mut dispatcher = Dispatcher::new();
//! let mut session = Session::new("bot");
//!
//! dispatcher.subscribe(
//!     &[CommandKind::Privmsg],
//!     handler_fn(|ctx, event| {
//!         ctx.send_message(event.source_nick(), "hi");
//!         Flow::Unbind
//!     }),
//! );
//!
//! let event = parse(":alice!a@host PRIVMSG bot :hello").unwrap();
//! dispatcher.dispatch(&event, &mut session);
//!
//! assert_eq!(session.take_outbound(), vec!["PRIVMSG alice :hi\r\n".to_string()]);
//! assert_eq!(dispatcher.subscriber_count(CommandKind::Privmsg), 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::channel::{self, Channel};
use crate::event::{CommandKind, Event};
use crate::session::Session;

/// What a handler wants to happen to its own subscription.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Stay subscribed.
    #[default]
    Continue,
    /// Remove this handler from every command it is subscribed to.
    Unbind,
}

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// An event observer.
pub trait Handler {
    /// Handle one event. Runs to completion before the next handler.
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow;
}

/// Adapter turning a closure into a [`Handler`]. See [`handler_fn`].
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: FnMut(&mut Context<'_>, &Event) -> Flow,
{
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        (self.0)(ctx, event)
    }
}

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: FnMut(&mut Context<'_>, &Event) -> Flow,
{
    HandlerFn(f)
}

struct Subscription {
    /// `None` while the handler is running.
    handler: Option<Box<dyn Handler>>,
    commands: Vec<CommandKind>,
}

/// Registry of subscriptions, keyed by command kind.
pub struct Dispatcher {
    routes: HashMap<CommandKind, Vec<SubscriptionId>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    next_id: u64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with an empty list for every command kind.
    pub fn new() -> Self {
        Self {
            routes: CommandKind::ALL.iter().map(|&k| (k, Vec::new())).collect(),
            subscriptions: HashMap::new(),
            next_id: 0,
        }
    }

    /// Subscribe `handler` to each of `commands`.
    ///
    /// The handler is appended to each command's list, so it runs after
    /// everything subscribed earlier. Duplicate kinds in `commands` are
    /// ignored. Subscribing to no commands at all drops the handler.
    pub fn subscribe<H>(&mut self, commands: &[CommandKind], handler: H) -> SubscriptionId
    where
        H: Handler + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let mut kinds: Vec<CommandKind> = Vec::with_capacity(commands.len());
        for &kind in commands {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            tracing::warn!(%id, "subscription without commands dropped");
            return id;
        }

        for kind in &kinds {
            self.routes.entry(*kind).or_default().push(id);
        }
        self.subscriptions.insert(
            id,
            Subscription {
                handler: Some(Box::new(handler)),
                commands: kinds,
            },
        );
        id
    }

    /// Remove a subscription from the given commands.
    ///
    /// Commands the subscription is not bound to are skipped silently,
    /// including when it already unbound itself. Once a subscription has no
    /// commands left, its handler is dropped.
    pub fn unsubscribe(&mut self, id: SubscriptionId, commands: &[CommandKind]) {
        let Some(sub) = self.subscriptions.get_mut(&id) else {
            return;
        };

        for kind in commands {
            if let Some(pos) = sub.commands.iter().position(|k| k == kind) {
                sub.commands.remove(pos);
                if let Some(ids) = self.routes.get_mut(kind) {
                    ids.retain(|other| *other != id);
                }
            }
        }

        if sub.commands.is_empty() {
            self.subscriptions.remove(&id);
        }
    }

    /// Remove a subscription from every command it is bound to.
    pub fn unsubscribe_all(&mut self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.remove(&id) {
            for kind in &sub.commands {
                if let Some(ids) = self.routes.get_mut(kind) {
                    ids.retain(|other| *other != id);
                }
            }
        }
    }

    /// Whether `id` is still bound to at least one command.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    /// Number of subscriptions currently bound to `command`.
    pub fn subscriber_count(&self, command: CommandKind) -> usize {
        self.routes.get(&command).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler subscribed to its command, in
    /// registration order.
    ///
    /// The subscriber list is fixed when dispatch starts: handlers added
    /// while it runs see the next event, not this one. A handler removed
    /// while it runs (by returning [`Flow::Unbind`] or by another handler
    /// unsubscribing it) is not invoked again.
    pub fn dispatch(&mut self, event: &Event, session: &mut Session) {
        let command = event.command();
        let ids = self.routes.get(&command).cloned().unwrap_or_default();

        for id in ids {
            let Some(sub) = self.subscriptions.get_mut(&id) else {
                continue;
            };
            if !sub.commands.contains(&command) {
                continue;
            }
            let Some(mut handler) = sub.handler.take() else {
                continue;
            };

            let flow = {
                let mut ctx = Context {
                    dispatcher: &mut *self,
                    session: &mut *session,
                };
                handler.handle(&mut ctx, event)
            };

            match flow {
                Flow::Unbind => {
                    tracing::trace!(%id, %command, "handler unbound itself");
                    self.unsubscribe_all(id);
                }
                Flow::Continue => {
                    if let Some(sub) = self.subscriptions.get_mut(&id) {
                        sub.handler = Some(handler);
                    }
                }
            }
        }
    }
}

/// Everything a handler can reach while it runs.
pub struct Context<'a> {
    /// The dispatcher running this handler.
    pub dispatcher: &'a mut Dispatcher,
    /// Client-side connection state.
    pub session: &'a mut Session,
}

impl<'a> Context<'a> {
    /// Create a context over a dispatcher and session.
    pub fn new(dispatcher: &'a mut Dispatcher, session: &'a mut Session) -> Self {
        Self {
            dispatcher,
            session,
        }
    }

    /// The bot's current nickname.
    pub fn nick(&self) -> &str {
        self.session.nick()
    }

    /// Look up a joined channel, case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.session.channel(name)
    }

    /// Queue `PRIVMSG <target> :<message>`.
    pub fn send_message(&mut self, target: &str, message: &str) {
        self.session.send_message(target, message);
    }

    /// Queue `NOTICE <target> :<message>`.
    pub fn send_notice(&mut self, target: &str, message: &str) {
        self.session.send_notice(target, message);
    }

    /// Queue `QUIT :<message>` and stop the read loop once it is written.
    pub fn quit(&mut self, message: &str) {
        self.session.quit(message);
    }

    /// Start tracking `channel` and queue a JOIN for it.
    pub fn join(&mut self, channel: &str) {
        channel::join(self.dispatcher, self.session, channel);
    }

    /// Queue a PART for `channel` and stop tracking it.
    pub fn part(&mut self, channel: &str) {
        channel::part(self.dispatcher, self.session, channel);
    }

    /// Subscribe another handler.
    pub fn subscribe<H>(&mut self, commands: &[CommandKind], handler: H) -> SubscriptionId
    where
        H: Handler + 'static,
    {
        self.dispatcher.subscribe(commands, handler)
    }

    /// Unsubscribe a handler from the given commands.
    pub fn unsubscribe(&mut self, id: SubscriptionId, commands: &[CommandKind]) {
        self.dispatcher.unsubscribe(id, commands);
    }
}
