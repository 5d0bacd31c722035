//! Command line arguments.

use clap::{CommandFactory, Parser};

use crate::config::types::ServerConfig;

/// Pipes UDP-messages to an IRC-channel.
#[derive(Debug, Parser)]
#[command(name = "snurr")]
#[command(version)]
pub struct Cli {
    /// IRC server
    #[arg(short = 'c', long = "connect", value_name = "SERVER", default_value = "irc.oftc.net")]
    pub connect: String,

    /// IRC server port
    #[arg(short = 'p', long = "port", value_name = "PORT", default_value_t = 6697)]
    pub port: u16,

    /// Connect with SSL (the default)
    #[arg(short = 's', long = "ssl", overrides_with = "no_ssl")]
    pub ssl: bool,

    /// Connect without SSL
    #[arg(long = "no-ssl")]
    pub no_ssl: bool,

    /// UDP listen port
    #[arg(short = 'l', long = "listen_port", value_name = "LISTEN_PORT", default_value_t = 55666)]
    pub listen_port: u16,

    /// Channel to join (a leading '#' is added if missing)
    #[arg(value_name = "CHANNEL")]
    pub channel: Option<String>,
}

impl Cli {
    /// Build the server settings, or `None` if no channel was given.
    pub fn server_config(&self) -> Option<ServerConfig> {
        let channel = self.channel.as_deref()?;
        Some(ServerConfig {
            host: self.connect.clone(),
            port: self.port,
            tls: self.tls(),
            channel: normalize_channel(channel),
            listen_port: self.listen_port,
        })
    }

    /// TLS is on unless `--no-ssl` was the last of the two flags given.
    pub fn tls(&self) -> bool {
        self.ssl || !self.no_ssl
    }

    /// One-line usage text.
    pub fn usage() -> String {
        Cli::command().render_usage().to_string()
    }
}

/// Prefix `#` to a channel name unless it already has one.
pub fn normalize_channel(channel: &str) -> String {
    if channel.starts_with('#') {
        channel.to_string()
    } else {
        format!("#{}", channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["snurr", "wiki"]).unwrap();
        let server = cli.server_config().unwrap();

        assert_eq!(server.host, "irc.oftc.net");
        assert_eq!(server.port, 6697);
        assert!(server.tls);
        assert_eq!(server.listen_port, 55666);
        assert_eq!(server.channel, "#wiki");
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "snurr", "-c", "irc.example.org", "-p", "6667", "--no-ssl", "-l", "4000", "#wiki",
        ])
        .unwrap();
        let server = cli.server_config().unwrap();

        assert_eq!(server.host, "irc.example.org");
        assert_eq!(server.port, 6667);
        assert!(!server.tls);
        assert_eq!(server.listen_port, 4000);
        assert_eq!(server.channel, "#wiki");
    }

    #[test]
    fn test_long_listen_port_flag() {
        let cli = Cli::try_parse_from(["snurr", "--listen_port", "1234", "--ssl", "x"]).unwrap();
        let server = cli.server_config().unwrap();
        assert_eq!(server.listen_port, 1234);
        assert!(server.tls);
    }

    #[test]
    fn test_last_ssl_flag_wins() {
        let on = Cli::try_parse_from(["snurr", "--no-ssl", "--ssl", "x"]).unwrap();
        assert!(on.tls());
        let off = Cli::try_parse_from(["snurr", "-s", "--no-ssl", "x"]).unwrap();
        assert!(!off.tls());
    }

    #[test]
    fn test_missing_channel() {
        let cli = Cli::try_parse_from(["snurr"]).unwrap();
        assert!(cli.server_config().is_none());
        assert!(Cli::usage().contains("CHANNEL"));
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("wiki"), "#wiki");
        assert_eq!(normalize_channel("#wiki"), "#wiki");
    }
}
