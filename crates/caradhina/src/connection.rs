//! The connection manager.
//!
//! [`Connection`] owns the socket, read through a [`FramedRead`] over the
//! [`LineFramer`], plus the dispatcher and the session. It is generic over
//! the stream so tests can drive it through an in-memory pipe.
//!
//! The read loop runs on one task. Each line is parsed and dispatched to
//! completion before the next is looked at, and lines queued by handlers are
//! written out after every dispatch.

use std::io;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{self, Channel};
use crate::dispatch::{Dispatcher, Handler, SubscriptionId};
use crate::error::{ConnectionError, Result};
use crate::event::CommandKind;
use crate::framer::{Frame, LineFramer};
use crate::outbound;
use crate::parse::parse;
use crate::session::{OwnNickTracker, Session};

/// Settings the connection needs, independent of any file format.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Nickname sent at registration, also used as user and real name.
    pub nick: String,
    /// Upper bound on a single socket read before the loop polls again.
    pub poll_interval: Duration,
    /// Pause between NICK and USER.
    pub registration_delay: Duration,
    /// How long to wait for something other than a NOTICE after registering.
    pub registration_timeout: Duration,
    /// Initial capacity of the socket read buffer.
    pub read_buffer_size: usize,
    /// QUIT message used by [`Connection::quit_default`].
    pub quit_message: String,
}

impl ConnectionConfig {
    /// Defaults for everything but the nick.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            poll_interval: Duration::from_millis(50),
            registration_delay: Duration::from_millis(100),
            registration_timeout: Duration::from_secs(60),
            read_buffer_size: 2048,
            quit_message: "Leaving".to_string(),
        }
    }
}

/// A single client connection to one server.
pub struct Connection<S = TcpStream> {
    framed: FramedRead<S, LineFramer>,
    /// Line read during the startup drain, dispatched first by the loop.
    requeued: Option<String>,
    /// Set after a transient read error, which ends the framed stream once.
    resuming: bool,
    dispatcher: Dispatcher,
    session: Session,
    /// Channels to join once registration settles.
    join_queue: Vec<String>,
    config: ConnectionConfig,
}

impl Connection<TcpStream> {
    /// Open a TCP connection to `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A, config: ConnectionConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        if let Ok(peer) = stream.peer_addr() {
            info!(%peer, "connected");
        }
        Ok(Self::new(stream, config))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S, config: ConnectionConfig) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe(&[CommandKind::Nick], OwnNickTracker);

        Self {
            framed: FramedRead::with_capacity(stream, LineFramer::new(), config.read_buffer_size),
            requeued: None,
            resuming: false,
            dispatcher,
            session: Session::new(config.nick.clone()),
            join_queue: Vec::new(),
            config,
        }
    }

    /// The settings this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Session state: own nick and joined channels.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Look up a joined channel, case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.session.channel(name)
    }

    /// The dispatcher, for inspecting subscriptions.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The dispatcher, for installing several handlers at once.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Subscribe a handler to `commands`.
    pub fn subscribe<H>(&mut self, commands: &[CommandKind], handler: H) -> SubscriptionId
    where
        H: Handler + 'static,
    {
        self.dispatcher.subscribe(commands, handler)
    }

    /// Unsubscribe a handler from `commands`.
    pub fn unsubscribe(&mut self, id: SubscriptionId, commands: &[CommandKind]) {
        self.dispatcher.unsubscribe(id, commands);
    }

    /// Queue channels to join once [`launch`](Self::launch) has drained the
    /// startup notices.
    pub fn join_on_launch<I, T>(&mut self, channels: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.join_queue.extend(channels.into_iter().map(Into::into));
    }

    /// Send `PRIVMSG <target> :<message>`.
    pub async fn send_message(&mut self, target: &str, message: &str) -> Result<()> {
        self.session.send_message(target, message);
        self.flush().await
    }

    /// Send `NOTICE <target> :<message>`.
    pub async fn send_notice(&mut self, target: &str, message: &str) -> Result<()> {
        self.session.send_notice(target, message);
        self.flush().await
    }

    /// Join `name` and start tracking its state.
    pub async fn join(&mut self, name: &str) -> Result<()> {
        channel::join(&mut self.dispatcher, &mut self.session, name);
        self.flush().await
    }

    /// Part `name` and stop tracking it.
    pub async fn part(&mut self, name: &str) -> Result<()> {
        channel::part(&mut self.dispatcher, &mut self.session, name);
        self.flush().await
    }

    /// Send `QUIT :<message>`. The read loop stops before its next read.
    pub async fn quit(&mut self, message: &str) -> Result<()> {
        self.session.quit(message);
        self.flush().await
    }

    /// [`quit`](Self::quit) with the configured quit message.
    pub async fn quit_default(&mut self) -> Result<()> {
        let message = self.config.quit_message.clone();
        self.quit(&message).await
    }

    /// Register, wait out the startup notices, join queued channels, then
    /// run the read loop until QUIT or a fatal error.
    pub async fn launch(&mut self) -> Result<()> {
        self.register().await?;
        self.drain_startup_notices().await?;

        for name in std::mem::take(&mut self.join_queue) {
            channel::join(&mut self.dispatcher, &mut self.session, &name);
        }
        self.flush().await?;

        self.run().await
    }

    /// Send `NICK` then `USER`, pausing in between.
    pub async fn register(&mut self) -> Result<()> {
        let nick = self.session.nick().to_owned();
        self.write_line(&outbound::nick(&nick)).await?;
        if !self.config.registration_delay.is_zero() {
            tokio::time::sleep(self.config.registration_delay).await;
        }
        self.write_line(&outbound::user(&nick)).await
    }

    /// Discard server banner NOTICEs until the first other line arrives.
    ///
    /// That line is left queued for the read loop, so nothing but the
    /// notices is lost.
    pub async fn drain_startup_notices(&mut self) -> Result<()> {
        let timeout = self.config.registration_timeout;
        let deadline = Instant::now() + timeout;
        let mut discarded = 0usize;

        loop {
            if Instant::now() >= deadline {
                warn!(?timeout, discarded, "registration timed out");
                return Err(ConnectionError::RegistrationTimeout(timeout));
            }

            let Some(line) = self.poll_line().await? else {
                continue;
            };
            match parse(&line) {
                Ok(event) if event.command() == CommandKind::Notice => {
                    trace!(line = %line, "discarding startup notice");
                    discarded += 1;
                }
                _ => {
                    debug!(discarded, "startup notices drained");
                    self.requeued = Some(line);
                    return Ok(());
                }
            }
        }
    }

    /// Read, parse and dispatch until the session quits or the connection
    /// fails.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if self.session.is_quitting() {
                self.flush().await?;
                if let Err(e) = self.framed.get_mut().shutdown().await {
                    debug!(error = %e, "shutdown after quit");
                }
                info!("quit, read loop finished");
                return Ok(());
            }

            let line = match self.poll_line().await {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "read loop terminated");
                    return Err(e);
                }
            };
            self.handle_line(&line).await?;
        }
    }

    /// Parse one line and dispatch it, then write whatever handlers queued.
    async fn handle_line(&mut self, line: &str) -> Result<()> {
        match parse(line) {
            Ok(event) => self.dispatcher.dispatch(&event, &mut self.session),
            Err(e) => warn!(line, error = %e, "discarding unparseable line"),
        }
        self.flush().await
    }

    /// Next line to dispatch, reading the socket for at most one poll
    /// interval.
    ///
    /// `Ok(None)` means no complete line arrived in time. PONG replies are
    /// written as soon as their PING is framed. Lines that cannot be decoded
    /// are logged and skipped.
    async fn poll_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.requeued.take() {
            return Ok(Some(line));
        }

        loop {
            let read = tokio::time::timeout(self.config.poll_interval, self.framed.next());
            let next = match read.await {
                Err(_elapsed) => return Ok(None),
                Ok(next) => next,
            };
            let resuming = std::mem::take(&mut self.resuming);

            match next {
                Some(Ok(Frame::Reply(reply))) => self.write_line(&reply).await?,
                Some(Ok(Frame::Line(line))) => {
                    debug!(line = %line, "<<");
                    return Ok(Some(line));
                }
                Some(Ok(Frame::Invalid(e))) => warn!(error = %e, "discarding undecodable line"),
                Some(Err(ConnectionError::Io(e))) if is_transient(&e) => {
                    trace!(error = %e, "transient read error, backing off");
                    self.resuming = true;
                    tokio::time::sleep(self.config.poll_interval).await;
                    return Ok(None);
                }
                Some(Err(e)) => return Err(e),
                None if resuming => return Ok(None),
                None => return Err(ConnectionError::Closed),
            }
        }
    }

    /// Write every line the session has queued.
    async fn flush(&mut self) -> Result<()> {
        while let Some(line) = self.session.pop_outbound() {
            self.write_line(&line).await?;
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        debug!(line = line.trim_end(), ">>");
        let stream = self.framed.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
