//! Integration tests driving a full `Connection` over an in-memory pipe.
//!
//! Each test plays the server side of the conversation on the other end of
//! a `tokio::io::duplex` stream, checking what the client writes and
//! feeding it server lines.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use caradhina::{
    handler_fn, CommandKind, Connection, ConnectionConfig, ConnectionError, EventKind, Flow,
};
use tokio::io::{
    split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

struct Server {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Server {
    fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn expect(&mut self, line: &str) {
        let got = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("client wrote nothing")
            .expect("read from client")
            .expect("client closed early");
        assert_eq!(got, line);
    }

    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    async fn registered(&mut self, nick: &str) {
        self.expect(&format!("NICK {nick}")).await;
        self.expect(&format!("USER {nick} {nick} {nick} {nick}")).await;
    }
}

fn pair(nick: &str) -> (Connection<DuplexStream>, Server) {
    let (client, server) = tokio::io::duplex(4096);
    let mut config = ConnectionConfig::new(nick);
    config.poll_interval = Duration::from_millis(10);
    config.registration_delay = Duration::ZERO;
    config.registration_timeout = Duration::from_secs(5);
    (Connection::new(client, config), Server::new(server))
}

/// Quit as soon as anyone says `quit please`.
fn quit_on_request(conn: &mut Connection<DuplexStream>) {
    conn.subscribe(
        &[CommandKind::Privmsg],
        handler_fn(|ctx, event| {
            if let EventKind::Privmsg { message, .. } = &event.kind {
                if message == "quit please" {
                    ctx.quit("done");
                }
            }
            Flow::Continue
        }),
    );
}

#[tokio::test]
async fn test_full_session() {
    let (mut conn, mut server) = pair("bot");
    conn.join_on_launch(["#Chan"]);
    quit_on_request(&mut conn);

    let script = async move {
        server.registered("bot").await;
        server
            .send(
                ":irc.test NOTICE * :*** Looking up your hostname...\r\n\
                 :irc.test NOTICE * :*** Found your hostname\r\n\
                 :irc.test 001 bot :Welcome to the test network\r\n",
            )
            .await;
        server.expect("JOIN #Chan").await;

        server
            .send(
                ":bot!b@host JOIN #chan\r\n\
                 :irc.test 332 bot #chan :Test topic\r\n\
                 :irc.test 353 bot = #chan :@alice +bob bot\r\n\
                 :irc.test 366 bot #chan :End of /NAMES list.\r\n\
                 :carol!c@host JOIN #chan\r\n\
                 :alice!a@host MODE #chan +v carol\r\n\
                 :bob!b@host PART #chan :bye\r\n\
                 PING :irc.test\r\n",
            )
            .await;
        server.expect("PONG :irc.test").await;

        server.send(":alice!a@host PRIVMSG #chan :quit please\r\n").await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();

    let channel = conn.channel("#chan").expect("still joined");
    assert!(channel.is_ready());
    assert_eq!(channel.topic(), "Test topic");
    assert!(channel.has_mode("alice", 'o'));
    assert!(channel.has_mode("carol", 'v'));
    assert!(channel.is_online("bot"));
    assert!(!channel.is_online("bob"));
    assert_eq!(channel.member_count(), 3);
    assert_eq!(conn.dispatcher().subscriber_count(CommandKind::Numeric), 0);
}

#[tokio::test]
async fn test_pong_split_across_reads() {
    let (mut conn, mut server) = pair("bot");
    quit_on_request(&mut conn);

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test 001 bot :Welcome\r\n").await;
        server.send("PING :serv").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        server.send(".example\r\n").await;
        server.expect("PONG :serv.example").await;
        server.send(":a!a@h PRIVMSG bot :quit please\r\n").await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();
}

#[tokio::test]
async fn test_malformed_line_does_not_stop_loop() {
    let (mut conn, mut server) = pair("bot");
    quit_on_request(&mut conn);

    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    conn.subscribe(
        &[CommandKind::Kick],
        handler_fn(move |_ctx, _event| {
            *counter.borrow_mut() += 1;
            Flow::Continue
        }),
    );

    let script = async move {
        server.registered("bot").await;
        server
            .send(
                ":irc.test 001 bot :Welcome\r\n\
                 :op!o@h KICK #chan\r\n\
                 :op!o@h\r\n\
                 :op!o@h KICK #chan victim :out\r\n\
                 :a!a@h PRIVMSG bot :quit please\r\n",
            )
            .await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();
    assert_eq!(*seen.borrow(), 1);
}

#[tokio::test]
async fn test_handler_replies_are_written() {
    let (mut conn, mut server) = pair("bot");
    quit_on_request(&mut conn);
    conn.subscribe(
        &[CommandKind::Privmsg],
        handler_fn(|ctx, event| {
            if let EventKind::Privmsg { message, .. } = &event.kind {
                if message == "hello" {
                    ctx.send_message(event.source_nick(), "Hello there!\r\nQUIT :injected");
                    ctx.send_notice(event.source_nick(), "noted");
                }
            }
            Flow::Continue
        }),
    );

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test 001 bot :Welcome\r\n").await;
        server.send(":alice!a@h PRIVMSG bot :hello\r\n").await;
        server.expect("PRIVMSG alice :Hello there!").await;
        server.expect("NOTICE alice :noted").await;
        server.send(":alice!a@h PRIVMSG bot :quit please\r\n").await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();
}

#[tokio::test]
async fn test_kicked_then_nick_change() {
    let (mut conn, mut server) = pair("bot");
    conn.join_on_launch(["#one", "#two"]);
    quit_on_request(&mut conn);

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test 001 bot :Welcome\r\n").await;
        server.expect("JOIN #one").await;
        server.expect("JOIN #two").await;
        server
            .send(
                ":irc.test 353 bot = #one :@alice bot\r\n\
                 :irc.test 366 bot #one :End of /NAMES list.\r\n\
                 :irc.test 353 bot = #two :alice bot\r\n\
                 :irc.test 366 bot #two :End of /NAMES list.\r\n\
                 :bot!b@h NICK :bot_\r\n\
                 :alice!a@h KICK #one bot_ :out\r\n\
                 :alice!a@h PRIVMSG #two :quit please\r\n",
            )
            .await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();

    assert_eq!(conn.session().nick(), "bot_");
    assert!(conn.channel("#one").is_none());
    let two = conn.channel("#two").expect("still in #two");
    assert!(two.is_online("bot_"));
    assert!(!two.is_online("bot"));
    assert_eq!(conn.dispatcher().subscriber_count(CommandKind::Join), 1);
}

#[tokio::test]
async fn test_peer_close_is_an_error() {
    let (mut conn, mut server) = pair("bot");

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test 001 bot :Welcome\r\n").await;
        server.writer.shutdown().await.unwrap();
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    assert!(matches!(result, Err(ConnectionError::Closed)));
}

#[tokio::test]
async fn test_undecodable_line_is_skipped() {
    let (mut conn, mut server) = pair("bot");
    quit_on_request(&mut conn);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let messages = Rc::clone(&seen);
    conn.subscribe(
        &[CommandKind::Privmsg],
        handler_fn(move |_ctx, event| {
            if let EventKind::Privmsg { message, .. } = &event.kind {
                messages.borrow_mut().push(message.clone());
            }
            Flow::Continue
        }),
    );

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test 001 bot :Welcome\r\n").await;
        server
            .writer
            .write_all(b":eve!e@h PRIVMSG #chan :caf\xe9\r\nPING :still-there\r\n")
            .await
            .unwrap();
        server.expect("PONG :still-there").await;
        server.send(":eve!e@h PRIVMSG #chan :caf\u{e9}\r\n").await;
        server.send(":eve!e@h PRIVMSG #chan :quit please\r\n").await;
        server.expect("QUIT :done").await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    result.unwrap();
    assert_eq!(*seen.borrow(), vec!["caf\u{e9}", "quit please"]);
}

#[tokio::test]
async fn test_registration_timeout() {
    let (client, server) = tokio::io::duplex(4096);
    let mut config = ConnectionConfig::new("bot");
    config.poll_interval = Duration::from_millis(10);
    config.registration_delay = Duration::ZERO;
    config.registration_timeout = Duration::from_millis(100);
    let mut conn = Connection::new(client, config);
    let mut server = Server::new(server);

    let script = async move {
        server.registered("bot").await;
        server.send(":irc.test NOTICE * :*** Still looking...\r\n").await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        server
    };

    let (result, _server) = tokio::join!(conn.launch(), script);
    assert!(matches!(
        result,
        Err(ConnectionError::RegistrationTimeout(_))
    ));
}

#[tokio::test]
async fn test_quit_outside_handlers() {
    let (mut conn, mut server) = pair("bot");

    let script = async move {
        server.expect("QUIT :Leaving").await;
        assert!(server.lines.next_line().await.unwrap().is_none());
        server
    };

    let client = async {
        conn.quit("Leaving").await.unwrap();
        conn.run().await
    };

    let (result, _server) = tokio::join!(client, script);
    result.unwrap();
    assert!(conn.session().is_quitting());
}
