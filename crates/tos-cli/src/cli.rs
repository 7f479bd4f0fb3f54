use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tos",
    about = "tos: write-once blob exchange over HTTP",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address
    #[arg(long, env = "TOS_BIND")]
    pub bind: Option<SocketAddr>,
    /// Redis URL; selects the Redis backend
    #[arg(short = 'c', long = "store-url", env = "TOS_STORE_URL")]
    pub store_url: Option<String>,
    /// Poll the in-process store instead of using wake-ups
    #[arg(long, conflicts_with = "store_url")]
    pub no_notify: bool,
    /// Entry lifetime in seconds
    #[arg(long)]
    pub ttl: Option<u64>,
    /// Long-poll deadline in milliseconds
    #[arg(long)]
    pub wait_deadline_ms: Option<u64>,
    /// Long-poll slice in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["tos", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve(_)));
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "tos",
            "serve",
            "--bind",
            "127.0.0.1:8080",
            "-c",
            "redis://localhost:6379",
            "--ttl",
            "60",
            "--wait-deadline-ms",
            "5000",
            "--poll-interval-ms",
            "250",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("127.0.0.1:8080".parse().unwrap()));
            assert_eq!(args.store_url.as_deref(), Some("redis://localhost:6379"));
            assert_eq!(args.ttl, Some(60));
            assert_eq!(args.wait_deadline_ms, Some(5000));
            assert_eq!(args.poll_interval_ms, Some(250));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_config_with_file() {
        let cli = Cli::try_parse_from(["tos", "config", "--config", "/etc/tos.toml"]).unwrap();
        if let Command::Config(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("/etc/tos.toml")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        assert!(Cli::try_parse_from(["tos", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn no_notify_conflicts_with_store_url() {
        assert!(Cli::try_parse_from(["tos", "serve", "--no-notify", "-c", "redis://x"]).is_err());
    }
}
