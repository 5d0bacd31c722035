//! Bot commands (!ping, !help, !tetrishigh).
//!
//! Commands are matched on exact verb and exact argument count. Anything
//! else gets the help nudge.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::common::error::PingError;
use crate::common::MessageContext;
use crate::config::types::MAX_LEADERBOARD_ROWS;
use crate::services::{Highscore, PingOutcome, Pinger, ScoresStore};

/// Prefix marking a message as a command.
pub const COMMAND_PREFIX: char = '!';

/// Known command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `!ping HOST`
    Ping,
    /// `!help`
    Help,
    /// `!tetrishigh`
    TetrisHigh,
}

impl Verb {
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "ping" => Some(Verb::Ping),
            "help" => Some(Verb::Help),
            "tetrishigh" => Some(Verb::TetrisHigh),
            _ => None,
        }
    }

    /// Number of arguments the verb takes.
    pub fn arity(self) -> usize {
        match self {
            Verb::Ping => 1,
            Verb::Help => 0,
            Verb::TetrisHigh => 0,
        }
    }
}

/// A command message with the prefix removed, split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn verb(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or_default()
    }
}

/// What a command produces.
pub enum Reply {
    /// Text available right away.
    Immediate(String),
    /// Lines produced by work that must run off the event loop.
    Deferred(BoxFuture<'static, Vec<String>>),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Immediate(text) => f.debug_tuple("Immediate").field(text).finish(),
            Reply::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Dispatches parsed commands to their handlers.
pub struct CommandRouter {
    pinger: Arc<dyn Pinger>,
    /// `None` disables `!tetrishigh`.
    scores: Option<Arc<dyn ScoresStore>>,
    leaderboard_limit: u32,
}

impl CommandRouter {
    pub fn new(pinger: Arc<dyn Pinger>) -> Self {
        Self {
            pinger,
            scores: None,
            leaderboard_limit: MAX_LEADERBOARD_ROWS,
        }
    }

    /// Enable `!tetrishigh` backed by the given store.
    pub fn with_leaderboard(mut self, scores: Arc<dyn ScoresStore>, limit: u32) -> Self {
        self.scores = Some(scores);
        self.leaderboard_limit = limit;
        self
    }

    pub fn leaderboard_enabled(&self) -> bool {
        self.scores.is_some()
    }

    /// Resolve a command to a verb the bot currently supports, with the
    /// right number of arguments.
    fn resolve<'a>(&self, command: &'a Command) -> Option<(Verb, &'a [String])> {
        let verb = Verb::parse(command.verb()?)?;
        let args = command.args();

        if args.len() != verb.arity() {
            return None;
        }
        if verb == Verb::TetrisHigh && !self.leaderboard_enabled() {
            return None;
        }
        Some((verb, args))
    }

    pub fn dispatch(&self, command: &Command, ctx: &MessageContext) -> Reply {
        let Some((verb, args)) = self.resolve(command) else {
            debug!("Unrecognized command from {}: {:?}", ctx.nick, command);
            return Reply::Immediate(help_nudge(&ctx.nick));
        };

        info!("!{:?} from {}", verb, ctx.nick);
        match verb {
            Verb::Help => Reply::Immediate(self.help_text()),
            Verb::Ping => {
                let pinger = Arc::clone(&self.pinger);
                let host = args[0].clone();
                Reply::Deferred(
                    async move {
                        let result = pinger.probe(&host).await;
                        vec![describe_ping(&host, result)]
                    }
                    .boxed(),
                )
            }
            Verb::TetrisHigh => {
                let Some(scores) = self.scores.clone() else {
                    return Reply::Immediate(help_nudge(&ctx.nick));
                };
                let limit = self.leaderboard_limit;
                Reply::Deferred(
                    async move {
                        match scores.top_scores(limit).await {
                            Ok(rows) => rows.iter().map(highscore_line).collect(),
                            Err(e) => {
                                warn!("Highscore lookup failed: {}", e);
                                vec!["Highscore: utilgjengelig".to_string()]
                            }
                        }
                    }
                    .boxed(),
                )
            }
        }
    }

    /// Summary of the commands that are currently enabled.
    pub fn help_text(&self) -> String {
        let mut text = String::new();
        text.push_str("Command: !help\n");
        text.push_str("   This help message\n");

        if self.leaderboard_enabled() {
            text.push_str("Command: !tetrishigh\n");
            text.push_str("   Display tetris highscore\n");
        }
        text.push_str("Command: !ping HOST\n");
        text.push_str("   Ping target host");

        text
    }
}

pub fn help_nudge(nick: &str) -> String {
    format!("Need !help {}?", nick)
}

pub fn highscore_line(row: &Highscore) -> String {
    format!("Highscore: {} by {}.", row.score, row.name)
}

pub fn describe_ping(host: &str, result: Result<PingOutcome, PingError>) -> String {
    match result {
        Ok(PingOutcome::Reachable) => format!("{} pinger fint den :P", host),
        Ok(PingOutcome::Unreachable) => format!("{} pinger ikke :(", host),
        Ok(PingOutcome::Status(code)) => format!("{}: ping returned {}", host, code),
        Err(e) => format!("feil med ping {}: {}", host, e),
    }
}
