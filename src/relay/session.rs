//! Chat session lifecycle.
//!
//! One session per connection: register, join the channel once the server
//! welcomes us, publish the session for the datagram relay, handle traffic
//! until the connection drops, then hand back to the reconnect loop.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::common::error::{ConnectionError, ProtocolError};
use crate::common::{BackoffConnector, MessageContext, OutgoingMessage};
use crate::config::types::{Config, ServerConfig};
use crate::protocol::message::{self as irc, Command, Message, Response};
use crate::protocol::{new_irc_connection, IrcConnection};
use crate::relay::gateway::ReplyGateway;
use crate::relay::handler::MessageHandler;
use crate::relay::registry::SessionRegistry;

/// Interval between client keep-alive PINGs.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(120);

/// Per-connection state.
struct Connection {
    /// Nick we are using or trying to register.
    nick: String,
    /// Set once the server has welcomed us.
    gateway: Option<ReplyGateway>,
    tx: mpsc::UnboundedSender<OutgoingMessage>,
}

impl Connection {
    /// Publish a gateway answering as the current nick.
    fn publish(&mut self, channel: &str, registry: &SessionRegistry) {
        let gateway = ReplyGateway::new(&self.nick, channel, self.tx.clone());
        registry.publish(gateway.clone());
        self.gateway = Some(gateway);
    }
}

pub struct ChatSession {
    nickname: String,
    realname: String,
    channel: String,
    handler: Arc<MessageHandler>,
    registry: SessionRegistry,
    backoff: BackoffConnector,
}

impl ChatSession {
    pub fn new(
        config: &Config,
        server: &ServerConfig,
        handler: Arc<MessageHandler>,
        registry: SessionRegistry,
    ) -> Self {
        Self {
            nickname: config.bot.nickname.clone(),
            realname: config.bot.realname.clone(),
            channel: server.channel.clone(),
            handler,
            registry,
            backoff: BackoffConnector::default(),
        }
    }

    pub fn backoff(&self) -> &BackoffConnector {
        &self.backoff
    }

    /// Connect, run the session, and reconnect after every loss. Never returns.
    pub async fn run_forever<F, Fut, S, E>(&mut self, mut connect: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
        S: AsyncRead + AsyncWrite + Unpin + Send,
        E: Display,
    {
        loop {
            let stream = self.backoff.attempt(&mut connect).await;

            match self.run(stream).await {
                Ok(()) => info!("Lost connection (closed by server)"),
                Err(e) => info!("Lost connection ({})", e),
            }

            let delay = self.backoff.record_failure();
            info!("Reconnecting in {} seconds", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one connection until it is lost. The live session is unpublished
    /// before returning.
    pub async fn run<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let result = self.drive(stream).await;
        self.registry.clear();
        result
    }

    async fn drive<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut connection = new_irc_connection(stream);
        let (tx, mut outgoing_rx) = mpsc::unbounded_channel();
        let mut state = Connection {
            nick: self.nickname.clone(),
            gateway: None,
            tx,
        };

        connection.send(irc::nick(&state.nick)).await?;
        connection.send(irc::user(&self.nickname, &self.realname)).await?;

        let mut keepalive = tokio::time::interval_at(
            tokio::time::Instant::now() + KEEPALIVE_INTERVAL,
            KEEPALIVE_INTERVAL,
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = connection.next() => {
                    match frame {
                        Some(Ok(message)) => {
                            self.handle_message(&mut state, &mut connection, message).await?;
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }

                // Replies from handlers, completions and the datagram relay
                Some(outgoing) = outgoing_rx.recv() => {
                    match connection.send(irc::privmsg(&outgoing.target, &outgoing.text)).await {
                        Ok(()) => {}
                        Err(ProtocolError::LineTooLong { len, max }) => {
                            warn!("Dropping reply to {} ({} > {} bytes)", outgoing.target, len, max);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                _ = keepalive.tick() => {
                    connection.send(irc::ping(&state.nick)).await?;
                }
            }
        }
    }

    async fn handle_message<S>(
        &mut self,
        state: &mut Connection,
        connection: &mut IrcConnection<S>,
        message: Message,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match &message.command {
            Command::PING(token, _) => {
                connection.send(irc::pong(token)).await?;
            }

            Command::Response(Response::RPL_WELCOME, args) => {
                if let Some(nick) = args.first() {
                    state.nick = nick.clone();
                }
                info!("Signed on as {}.", state.nick);

                state.publish(&self.channel, &self.registry);
                self.backoff.reset();

                connection.send(irc::join(&self.channel)).await?;
            }

            Command::Response(Response::ERR_NICKNAMEINUSE, _) if state.gateway.is_none() => {
                state.nick.push('_');
                info!("Nickname in use, trying {}", state.nick);
                connection.send(irc::nick(&state.nick)).await?;
            }

            Command::NICK(new_nick) if irc::is_from(&message, &state.nick) => {
                info!("Now known as {}.", new_nick);
                state.nick = new_nick.clone();
                // Replies to messages addressed to the new nick must stay private.
                if state.gateway.is_some() {
                    state.publish(&self.channel, &self.registry);
                }
            }

            Command::JOIN(channel, _, _) => {
                if irc::is_from(&message, &state.nick) {
                    info!("Joined {}.", channel);
                }
            }

            Command::PRIVMSG(target, text) => {
                let Some(gateway) = &state.gateway else {
                    debug!("PRIVMSG before registration ignored");
                    return Ok(());
                };
                let sender = irc::source(&message);

                info!("PRIVMSG: {}: {}", sender, text);
                if text.starts_with('\u{1}') {
                    debug!("Ignoring CTCP from {}", sender);
                    return Ok(());
                }

                self.handler
                    .handle(MessageContext::new(sender, target.as_str(), text.as_str()), gateway);
            }

            Command::ERROR(reason) => {
                return Err(ConnectionError::ServerError {
                    reason: reason.clone(),
                }
                .into());
            }

            _ => debug!("Unhandled: {}", message.to_string().trim_end()),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;
    use crate::common::error::PingError;
    use crate::relay::router::CommandRouter;
    use crate::services::fakes::{FakePinger, FakeSummarizer, GatedPinger};
    use crate::services::{PingOutcome, Pinger};

    fn reachable() -> Result<PingOutcome, PingError> {
        Ok(PingOutcome::Reachable)
    }

    fn make_session_with(registry: SessionRegistry, pinger: Arc<dyn Pinger>) -> ChatSession {
        let router = CommandRouter::new(pinger);
        let handler = MessageHandler::new(router, Arc::new(FakeSummarizer::ok("Example")));
        let server = ServerConfig {
            host: "irc.test".to_string(),
            port: 6667,
            tls: false,
            channel: "#snurr".to_string(),
            listen_port: 55666,
        };
        ChatSession::new(&Config::default(), &server, Arc::new(handler), registry)
    }

    fn make_session(registry: SessionRegistry) -> ChatSession {
        make_session_with(registry, Arc::new(FakePinger::new(reachable)))
    }

    async fn expect<S>(server: &mut IrcConnection<S>) -> Message
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .expect("session went quiet")
            .expect("session closed the connection")
            .expect("valid line")
    }

    async fn say<S>(server: &mut IrcConnection<S>, line: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        server.send(line.parse::<Message>().unwrap()).await.unwrap();
    }

    /// Expect a PRIVMSG and return its target and text.
    async fn expect_privmsg<S>(server: &mut IrcConnection<S>) -> (String, String)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match expect(server).await.command {
            Command::PRIVMSG(target, text) => (target, text),
            other => panic!("expected PRIVMSG, got {:?}", other),
        }
    }

    /// Walk a fresh session through registration as `nick`.
    async fn sign_on<S>(server: &mut IrcConnection<S>, nick: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        assert_eq!(expect(server).await, irc::nick("snurr"));
        assert_eq!(expect(server).await, irc::user("snurr", "snurr"));
        say(server, &format!(":irc.test 001 {} :Welcome", nick)).await;
        assert_eq!(expect(server).await, irc::join("#snurr"));
    }

    #[tokio::test]
    async fn test_registration_bytes() {
        let mock = tokio_test::io::Builder::new()
            .write(b"NICK snurr\r\n")
            .write(b"USER snurr 0 * snurr\r\n")
            .read(b":irc.test 001 snurr :Welcome\r\n")
            .write(b"JOIN #snurr\r\n")
            .build();

        let mut session = make_session(SessionRegistry::new());
        session.run(mock).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let registry = SessionRegistry::new();
        let mut session = make_session(registry.clone());
        session.backoff.record_failure();
        session.backoff.record_failure();

        let (client, server) = duplex(16 * 1024);
        let task = tokio::spawn(async move {
            let result = session.run(client).await;
            (session, result)
        });
        let mut server = new_irc_connection(server);

        assert_eq!(expect(&mut server).await, irc::nick("snurr"));
        assert_eq!(expect(&mut server).await, irc::user("snurr", "snurr"));
        assert!(registry.current().is_none());

        say(&mut server, ":irc.test 433 * snurr :Nickname is already in use").await;
        assert_eq!(expect(&mut server).await, irc::nick("snurr_"));

        say(&mut server, ":irc.test 001 snurr_ :Welcome").await;
        assert_eq!(expect(&mut server).await, irc::join("#snurr"));
        assert_eq!(registry.current().unwrap().nickname(), "snurr_");

        say(&mut server, "PING :irc.test").await;
        assert_eq!(expect(&mut server).await, irc::pong("irc.test"));

        // Private help, answered to the sender's nick
        say(&mut server, ":alice!~a@example.org PRIVMSG snurr_ :!help").await;
        assert_eq!(
            expect_privmsg(&mut server).await,
            ("alice".to_string(), "Command: !help".to_string())
        );
        for _ in 0..3 {
            assert_eq!(expect_privmsg(&mut server).await.0, "alice");
        }

        // Link in the channel, answered in the channel after the summary
        say(&mut server, ":alice!~a@example.org PRIVMSG #snurr :see http://example.com/page").await;
        assert_eq!(expect(&mut server).await, irc::privmsg("#snurr", "Example"));

        // Datagram path through the published gateway
        registry.current().unwrap().deliver_to_channel("[[Main Page]] edited");
        assert_eq!(
            expect(&mut server).await,
            irc::privmsg("#snurr", "[[Main Page]] edited")
        );

        drop(server);
        let (session, result) = task.await.unwrap();
        assert!(result.is_ok());
        assert!(registry.current().is_none());
        assert_eq!(session.backoff().interval(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_own_nick_change_keeps_private_replies_private() {
        let registry = SessionRegistry::new();
        let mut session = make_session(registry.clone());

        let (client, server) = duplex(16 * 1024);
        let task = tokio::spawn(async move { session.run(client).await });
        let mut server = new_irc_connection(server);
        sign_on(&mut server, "snurr").await;

        // Someone else's rename is not ours.
        say(&mut server, ":bob!b@h NICK :robert").await;
        say(&mut server, ":snurr!u@h NICK :snurr2").await;
        say(&mut server, ":alice!a@h PRIVMSG snurr2 :!help").await;

        let (target, text) = expect_privmsg(&mut server).await;
        assert_eq!(target, "alice");
        assert_eq!(text, "Command: !help");
        for _ in 0..3 {
            assert_eq!(expect_privmsg(&mut server).await.0, "alice");
        }
        assert_eq!(registry.current().unwrap().nickname(), "snurr2");

        // Messages to the old nick are no longer addressed to us.
        say(&mut server, ":alice!a@h PRIVMSG snurr :!help").await;
        assert_eq!(expect_privmsg(&mut server).await.0, "#snurr");

        drop(server);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_slow_commands_do_not_stall_and_keep_their_context() {
        let registry = SessionRegistry::new();
        let pinger = Arc::new(GatedPinger::new());
        let carol_gate = pinger.gate("slow.example");
        let dave_gate = pinger.gate("far.example");
        let mut session = make_session_with(registry.clone(), pinger);

        let (client, server) = duplex(16 * 1024);
        let task = tokio::spawn(async move { session.run(client).await });
        let mut server = new_irc_connection(server);
        sign_on(&mut server, "snurr").await;

        say(&mut server, ":carol!c@h PRIVMSG snurr :!ping slow.example").await;
        say(&mut server, ":dave!d@h PRIVMSG #snurr :!ping far.example").await;

        // Both pings are pending; other traffic is still answered.
        say(&mut server, ":alice!a@h PRIVMSG snurr :!help").await;
        for _ in 0..4 {
            assert_eq!(expect_privmsg(&mut server).await.0, "alice");
        }

        // Complete in reverse order.
        dave_gate.send(PingOutcome::Reachable).unwrap();
        assert_eq!(
            expect_privmsg(&mut server).await,
            ("#snurr".to_string(), "far.example pinger fint den :P".to_string())
        );

        carol_gate.send(PingOutcome::Unreachable).unwrap();
        assert_eq!(
            expect_privmsg(&mut server).await,
            ("carol".to_string(), "slow.example pinger ikke :(".to_string())
        );

        drop(server);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_server_error_ends_session() {
        let registry = SessionRegistry::new();
        let mut session = make_session(registry.clone());

        let (client, server) = duplex(16 * 1024);
        let task = tokio::spawn(async move { session.run(client).await });
        let mut server = new_irc_connection(server);
        sign_on(&mut server, "snurr").await;
        assert!(registry.current().is_some());

        say(&mut server, "ERROR :Closing Link: snurr (Killed)").await;
        let result = task.await.unwrap();
        assert!(result.is_err());
        assert!(registry.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forever_reconnects() {
        let registry = SessionRegistry::new();
        let mut session = make_session(registry.clone());
        let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();

        // Every connection is closed by the "server" right away.
        let mut attempts = 0;
        let connect = move || {
            attempts += 1;
            let n = attempts;
            let accepted_tx = accepted_tx.clone();
            async move {
                if n == 1 {
                    return Err("connection refused");
                }
                let (client, server) = duplex(1024);
                drop(server);
                accepted_tx.send(n).ok();
                Ok(client)
            }
        };

        let task = tokio::spawn(async move { session.run_forever(connect).await });

        assert_eq!(accepted_rx.recv().await, Some(2));
        assert_eq!(accepted_rx.recv().await, Some(3));
        task.abort();
    }
}
