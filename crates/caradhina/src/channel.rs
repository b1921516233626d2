//! Per-channel membership, mode and topic tracking.
//!
//! A [`Channel`] is rebuilt purely from the event stream. Joining a channel
//! subscribes two listeners bound to it by name:
//!
//! - a bootstrap listener on NUMERIC that seeds the topic (332) and the
//!   member list (353) and unbinds itself at end of names (366);
//! - a membership listener on JOIN, PART, KICK, QUIT, NICK, MODE and TOPIC
//!   that keeps the state current afterwards.
//!
//! Channel names and nicknames are compared and stored lower-cased.

use std::collections::{BTreeSet, HashMap};

use crate::dispatch::{Context, Dispatcher, Flow, Handler, SubscriptionId};
use crate::event::{source_nick, CommandKind, Event, EventKind};
use crate::outbound;
use crate::parse::trim_colon;
use crate::session::Session;

/// RPL_TOPIC
pub const RPL_TOPIC: u16 = 332;
/// RPL_NAMREPLY
pub const RPL_NAMREPLY: u16 = 353;
/// RPL_ENDOFNAMES
pub const RPL_ENDOFNAMES: u16 = 366;

/// The user-status modes a channel member can hold.
pub const STATUS_MODES: [char; 5] = ['q', 'a', 'o', 'h', 'v'];

/// Commands the bootstrap listener is bound to.
const BOOTSTRAP_COMMANDS: &[CommandKind] = &[CommandKind::Numeric];

/// Commands the membership listener is bound to.
const MEMBERSHIP_COMMANDS: &[CommandKind] = &[
    CommandKind::Join,
    CommandKind::Part,
    CommandKind::Kick,
    CommandKind::Quit,
    CommandKind::Nick,
    CommandKind::Mode,
    CommandKind::Topic,
];

/// Status modes held by one member.
pub type Modes = BTreeSet<char>;

/// Case-fold a channel name or nickname for use as a key.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Map a NAMES prefix character to its status mode.
///
/// ```
/// use caradhina::channel::prefix_mode;
///
/// assert_eq!(prefix_mode('@'), Some('o'));
/// assert_eq!(prefix_mode('+'), Some('v'));
/// assert_eq!(prefix_mode('a'), None);
/// ```
pub fn prefix_mode(prefix: char) -> Option<char> {
    match prefix {
        '~' => Some('q'),
        '&' => Some('a'),
        '@' => Some('o'),
        '%' => Some('h'),
        '+' => Some('v'),
        _ => None,
    }
}

/// Where a channel is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// JOIN sent, waiting for the end of the names list.
    Bootstrapping,
    /// Names list received; steady state.
    Ready,
}

/// One joined channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    online: HashMap<String, Modes>,
    topic: String,
    phase: Phase,
    bootstrap: Option<SubscriptionId>,
    membership: Option<SubscriptionId>,
}

impl Channel {
    fn new(name: String) -> Self {
        Self {
            name,
            online: HashMap::new(),
            topic: String::new(),
            phase: Phase::Bootstrapping,
            bootstrap: None,
            membership: None,
        }
    }

    /// Lower-cased channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current topic; empty if none is known.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the initial names list has been received.
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Whether `nick` is in the channel.
    pub fn is_online(&self, nick: &str) -> bool {
        self.online.contains_key(&fold(nick))
    }

    /// Whether `nick` is in the channel and holds status `mode`.
    pub fn has_mode(&self, nick: &str, mode: char) -> bool {
        self.online
            .get(&fold(nick))
            .is_some_and(|modes| modes.contains(&mode))
    }

    /// Status modes held by `nick`, if present.
    pub fn modes(&self, nick: &str) -> Option<&Modes> {
        self.online.get(&fold(nick))
    }

    /// Every member with its status modes.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Modes)> {
        self.online.iter().map(|(nick, modes)| (nick.as_str(), modes))
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.online.len()
    }

    /// The bootstrap listener, while it is still bound.
    pub fn bootstrap_listener(&self) -> Option<SubscriptionId> {
        self.bootstrap
    }

    /// Every listener still bound for this channel.
    pub fn listeners(&self) -> Vec<SubscriptionId> {
        self.bootstrap.into_iter().chain(self.membership).collect()
    }

    fn add_member(&mut self, nick: &str) {
        self.online.entry(fold(nick)).or_default();
    }

    fn remove_member(&mut self, nick: &str) -> bool {
        self.online.remove(&fold(nick)).is_some()
    }

    fn rename_member(&mut self, old: &str, new: &str) {
        if let Some(modes) = self.online.remove(&fold(old)) {
            self.online.insert(fold(new), modes);
        }
    }

    /// Record every entry of a names list: `:@alice +bob charlie`.
    ///
    /// Each entry may carry several prefix characters (`@+alice`); all of
    /// them are kept.
    fn apply_names(&mut self, names: &str) {
        for entry in trim_colon(names).split(' ').filter(|e| !e.is_empty()) {
            let split = entry
                .find(|c: char| prefix_mode(c).is_none())
                .unwrap_or(entry.len());
            let (prefixes, nick) = entry.split_at(split);
            let nick = source_nick(nick);
            if nick.is_empty() {
                continue;
            }

            let modes: Modes = prefixes.chars().filter_map(prefix_mode).collect();
            self.online.insert(fold(nick), modes);
        }
    }

    /// Apply a mode change such as `+o` with param `alice`, or `+ov-h`
    /// with params `alice bob carol`.
    ///
    /// Status modes take the next parameter as the target nick. List and
    /// key modes consume a parameter without touching membership; `l`
    /// consumes one only when set. Unknown nicks are ignored.
    fn apply_mode(&mut self, modes: &str, param: Option<&str>) {
        let mut params = param.unwrap_or("").split(' ').filter(|p| !p.is_empty());
        let mut adding = true;

        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                m if STATUS_MODES.contains(&m) => {
                    let Some(nick) = params.next() else {
                        break;
                    };
                    match self.online.get_mut(&fold(nick)) {
                        Some(held) if adding => {
                            held.insert(m);
                        }
                        Some(held) => {
                            held.remove(&m);
                        }
                        None => {
                            tracing::trace!(channel = %self.name, nick, "mode for unknown nick")
                        }
                    }
                }
                'b' | 'e' | 'I' | 'k' => {
                    params.next();
                }
                'l' if adding => {
                    params.next();
                }
                _ => {}
            }
        }
    }

    fn finish_bootstrap(&mut self) {
        self.phase = Phase::Ready;
        self.bootstrap = None;
    }

    /// Unbind every listener and forget all state.
    ///
    /// Listeners that already unbound themselves are skipped.
    pub fn teardown(&mut self, dispatcher: &mut Dispatcher) {
        if let Some(id) = self.bootstrap.take() {
            dispatcher.unsubscribe(id, BOOTSTRAP_COMMANDS);
        }
        if let Some(id) = self.membership.take() {
            dispatcher.unsubscribe(id, MEMBERSHIP_COMMANDS);
        }
        self.online.clear();
        self.topic.clear();
    }
}

/// Start tracking `name`: subscribe its listeners and queue the JOIN.
///
/// Joining a channel that is already tracked does nothing.
pub(crate) fn join(dispatcher: &mut Dispatcher, session: &mut Session, name: &str) {
    let key = fold(name);
    if session.channels.contains_key(&key) {
        tracing::debug!(channel = %key, "already tracking channel");
        return;
    }

    let mut channel = Channel::new(key.clone());
    channel.bootstrap = Some(dispatcher.subscribe(
        BOOTSTRAP_COMMANDS,
        BootstrapListener {
            channel: key.clone(),
        },
    ));
    channel.membership = Some(dispatcher.subscribe(
        MEMBERSHIP_COMMANDS,
        MembershipListener {
            channel: key.clone(),
        },
    ));
    session.channels.insert(key.clone(), channel);

    tracing::info!(channel = %key, "joining channel");
    session.send_raw(outbound::join(name));
}

/// Queue a PART for `name` and stop tracking it.
pub(crate) fn part(dispatcher: &mut Dispatcher, session: &mut Session, name: &str) {
    session.send_raw(outbound::part(name));
    leave(dispatcher, session, &fold(name));
}

/// Drop a channel and everything subscribed on its behalf.
fn leave(dispatcher: &mut Dispatcher, session: &mut Session, key: &str) {
    if let Some(mut channel) = session.channels.remove(key) {
        channel.teardown(dispatcher);
        tracing::info!(channel = %key, "left channel");
    }
}

/// Seeds topic and members from the numerics that follow a JOIN.
struct BootstrapListener {
    channel: String,
}

impl Handler for BootstrapListener {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let EventKind::Numeric { code, message, .. } = &event.kind else {
            return Flow::Continue;
        };
        let Some(channel) = ctx.session.channels.get_mut(&self.channel) else {
            return Flow::Unbind;
        };

        match *code {
            RPL_TOPIC => {
                let (name, topic) = message.split_once(' ').unwrap_or((message.as_str(), ""));
                if fold(name) == self.channel {
                    channel.topic = trim_colon(topic).to_owned();
                    tracing::trace!(channel = %self.channel, topic = %channel.topic, "topic");
                }
            }
            RPL_NAMREPLY => {
                if let Some((name, names)) = split_names(message) {
                    if fold(name) == self.channel {
                        channel.apply_names(names);
                    }
                }
            }
            RPL_ENDOFNAMES => {
                let name = message.split(' ').next().unwrap_or("");
                if fold(name) == self.channel {
                    channel.finish_bootstrap();
                    tracing::debug!(
                        channel = %self.channel,
                        members = channel.member_count(),
                        online = ?channel.online,
                        "channel bootstrap complete"
                    );
                    return Flow::Unbind;
                }
            }
            _ => {}
        }
        Flow::Continue
    }
}

/// Split a names reply into channel and names list.
///
/// Accepts both `= #chan :names` and `#chan :names`.
fn split_names(message: &str) -> Option<(&str, &str)> {
    let (first, rest) = message.split_once(' ')?;
    if matches!(first, "=" | "*" | "@") {
        Some(rest.split_once(' ').unwrap_or((rest, "")))
    } else {
        Some((first, rest))
    }
}

/// Keeps membership, modes and topic current after the join.
struct MembershipListener {
    channel: String,
}

impl MembershipListener {
    fn is_mine(&self, name: &str) -> bool {
        fold(name) == self.channel
    }
}

impl Handler for MembershipListener {
    fn handle(&mut self, ctx: &mut Context<'_>, event: &Event) -> Flow {
        let own_nick = fold(ctx.session.nick());
        let Some(channel) = ctx.session.channels.get_mut(&self.channel) else {
            return Flow::Unbind;
        };

        let left = match &event.kind {
            EventKind::Join { channel: name } if self.is_mine(name) => {
                channel.add_member(event.source_nick());
                false
            }
            EventKind::Part { channel: name, .. } if self.is_mine(name) => {
                let nick = event.source_nick();
                channel.remove_member(nick);
                fold(nick) == own_nick
            }
            EventKind::Kick {
                channel: name,
                nick,
                ..
            } if self.is_mine(name) => {
                channel.remove_member(nick);
                fold(nick) == own_nick
            }
            EventKind::Quit { .. } => {
                channel.remove_member(event.source_nick());
                false
            }
            EventKind::Nick { nick } => {
                channel.rename_member(event.source_nick(), nick);
                false
            }
            EventKind::Mode {
                channel: name,
                modes,
                param,
            } if self.is_mine(name) => {
                channel.apply_mode(modes, param.as_deref());
                false
            }
            EventKind::Topic { channel: name, topic } if self.is_mine(name) => {
                channel.topic = topic.clone();
                false
            }
            _ => return Flow::Continue,
        };
        tracing::trace!(channel = %self.channel, online = ?channel.online, "membership updated");

        if left {
            leave(ctx.dispatcher, ctx.session, &self.channel);
            return Flow::Unbind;
        }
        Flow::Continue
    }
}
