//! Snurr - IRC relay bot
//!
//! Joins one IRC channel, answers a handful of commands, summarizes links
//! posted in chat, and relays UDP datagrams (e.g. wiki change notifications)
//! into the channel.

mod common;
mod config;
mod protocol;
mod relay;
mod services;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use config::cli::Cli;
use config::{env::get_config_path, load_and_validate};
use protocol::Connector;
use relay::{ChatSession, CommandRouter, DatagramRelay, MessageHandler, SessionRegistry};
use services::{HttpSummarizer, SqlScoresStore, SystemPinger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let Some(server) = cli.server_config() else {
        eprintln!("{}", Cli::usage());
        std::process::exit(1);
    };

    info!("Snurr v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);
    let config = load_and_validate(&config_path, &server).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("  Server: {}:{} (tls: {})", server.host, server.port, server.tls);
    info!("  Channel: {}", server.channel);
    info!("  Nickname: {}", config.bot.nickname);
    info!("  Leaderboard: {}", config.leaderboard.enabled);

    // Collaborators
    let pinger = Arc::new(SystemPinger::new(config.ping.timeout()));
    let summarizer = Arc::new(HttpSummarizer::new(&config.links)?);

    let mut router = CommandRouter::new(pinger);
    if config.leaderboard.enabled {
        let url = config.leaderboard.database_url.as_deref().unwrap_or_default();
        let store = SqlScoresStore::connect_lazy(url)?;
        router = router.with_leaderboard(Arc::new(store), config.leaderboard.limit);
    }
    let handler = Arc::new(MessageHandler::new(router, summarizer));

    // UDP feed
    let registry = SessionRegistry::new();
    let listen_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, server.listen_port));
    let datagrams = DatagramRelay::bind(listen_addr, registry.clone()).await?;
    let datagram_task = tokio::spawn(datagrams.run());

    // Chat session
    let connector = Connector::from_config(&server)?;
    let mut session = ChatSession::new(&config, &server, handler, registry);
    let chat = session.run_forever(|| connector.connect());

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        _ = chat => {}
    }

    datagram_task.abort();
    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
