//! # caradhina
//!
//! The client half of an IRC connection, as a pipeline:
//!
//! - [`framer`] turns socket bytes into complete lines and answers PINGs;
//! - [`parse`] turns a line into a typed [`Event`];
//! - [`Dispatcher`] hands each event to the [`Handler`]s subscribed to its
//!   [`CommandKind`], in registration order;
//! - [`channel`] rebuilds membership, status modes and topic of every joined
//!   channel from those events alone;
//! - [`Connection`] owns the socket and drives the read loop.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caradhina::{handler_fn, CommandKind, Connection, ConnectionConfig, EventKind, Flow};
//!
//! # async fn demo() -> caradhina::Result<()> {
//! let mut conn = Connection::connect("irc.example.net:6667", ConnectionConfig::new("hanezeve")).await?;
//! conn.join_on_launch(["#paratest"]);
//!
//! conn.subscribe(
//!     &[CommandKind::Privmsg],
//!     handler_fn(|ctx, event| {
//!         if let EventKind::Privmsg { target, message } = &event.kind {
//!             if message == "!stop" {
//!                 ctx.send_message(target, "Bye!");
//!                 ctx.quit("Leaving");
//!             }
//!         }
//!         Flow::Continue
//!     }),
//! );
//!
//! conn.launch().await
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod channel;
pub mod connection;
pub mod ctcp;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod framer;
pub mod outbound;
pub mod parse;
pub mod session;

pub use self::channel::Channel;
pub use self::connection::{Connection, ConnectionConfig};
pub use self::dispatch::{handler_fn, Context, Dispatcher, Flow, Handler, SubscriptionId};
pub use self::error::{ConnectionError, FramingError, ParseError, Result};
pub use self::event::{CommandKind, Event, EventKind};
pub use self::framer::LineFramer;
pub use self::parse::parse;
pub use self::session::Session;
