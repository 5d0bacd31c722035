//! Inbound chat message handling.
//!
//! Command messages go to the [`CommandRouter`], everything else is scanned
//! for links. Slow work (probes, page fetches, database queries) is spawned
//! as a task that answers through the session's gateway when it completes,
//! using the context captured when the message arrived.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::common::MessageContext;
use crate::relay::gateway::ReplyGateway;
use crate::relay::links::{failure_tag, LinkScanner};
use crate::relay::router::{Command, CommandRouter, Reply, COMMAND_PREFIX};
use crate::services::PageSummarizer;

pub struct MessageHandler {
    router: CommandRouter,
    scanner: LinkScanner,
    summarizer: Arc<dyn PageSummarizer>,
}

impl MessageHandler {
    pub fn new(router: CommandRouter, summarizer: Arc<dyn PageSummarizer>) -> Self {
        Self {
            router,
            scanner: LinkScanner::new(),
            summarizer,
        }
    }

    /// Handle one PRIVMSG.
    ///
    /// Returns the handle of the spawned task when the reply is deferred.
    pub fn handle(&self, ctx: MessageContext, gateway: &ReplyGateway) -> Option<JoinHandle<()>> {
        if let Some(rest) = ctx.text.strip_prefix(COMMAND_PREFIX) {
            let command = Command::parse(rest);
            return match self.router.dispatch(&command, &ctx) {
                Reply::Immediate(text) => {
                    gateway.deliver(&ctx, &text);
                    None
                }
                Reply::Deferred(lines) => {
                    let gateway = gateway.clone();
                    Some(tokio::spawn(async move {
                        for line in lines.await {
                            gateway.deliver(&ctx, &line);
                        }
                    }))
                }
            };
        }

        let url = self.scanner.scan(&ctx.text)?.to_string();
        debug!("Link from {}: {}", ctx.nick, url);

        let summarizer = Arc::clone(&self.summarizer);
        let gateway = gateway.clone();
        Some(tokio::spawn(async move {
            let reply = match summarizer.summarize(&url).await {
                Ok(summary) => summary,
                Err(e) => {
                    debug!("Summary of {} failed: {}", url, e);
                    failure_tag(&e).to_string()
                }
            };
            gateway.deliver(&ctx, &reply);
        }))
    }
}
