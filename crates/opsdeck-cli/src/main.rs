mod cmd_ask;
mod cmd_config;
mod cmd_export;
mod cmd_history;
mod cmd_show;
mod cmd_status;
mod cmd_tools;
mod cmd_watch;
mod surface;
#[cfg(feature = "tui")]
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use opsdeck_client::HttpBackend;
use opsdeck_core::DeckConfig;
use tracing_subscriber::EnvFilter;

use cmd_config::ConfigCmd;

#[derive(Parser)]
#[command(name = "opsdeck", version, about = "Operations dashboard for the terminal")]
struct Cli {
    /// Config file (defaults to <config dir>/opsdeck/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overriding `backend_url`
    #[arg(long, global = true, env = "OPSDECK_URL")]
    url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the backend's tool catalog, grouped
    Tools {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit a query against one or more tools
    Ask {
        /// Query text
        text: String,
        /// Tool to query (repeatable)
        #[arg(long = "tool", short = 't')]
        tools: Vec<String>,
        /// Time range in hours, for tools that take one
        #[arg(long)]
        hours: Option<u32>,
        /// Also write the result as a standalone HTML document
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show recent queries
    History {
        /// Show every entry instead of the preview
        #[arg(long)]
        all: bool,
        /// Filter by query text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the stored result of a past query
    Show {
        /// Index from `opsdeck history`
        index: usize,
        /// Also write the result as a standalone HTML document
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Poll every health feed once
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Live status dashboard
    Watch,
    /// Export a past result through the backend's document endpoint
    Export {
        /// Index from `opsdeck history`
        index: usize,
        /// Destination file
        #[arg(long)]
        out: PathBuf,
    },
    /// Read or write client config
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

/// Resolved config plus the backend built from it.
pub struct Deck {
    pub config_path: PathBuf,
    pub config: DeckConfig,
    pub backend: Arc<HttpBackend>,
}

impl Deck {
    fn open(config_path: &std::path::Path, url: Option<String>) -> anyhow::Result<Self> {
        let mut config = DeckConfig::load(config_path)?;
        if let Some(url) = url {
            config.backend_url = url;
        }
        let backend = Arc::new(HttpBackend::from_config(&config));
        tracing::debug!(url = %backend.base_url(), "backend configured");
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            backend,
        })
    }
}

fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_env("OPSDECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The dashboard owns the terminal; log lines would tear it.
    let interactive = matches!(cli.cmd, Command::Watch) && cfg!(feature = "tui");
    init_logging(if interactive { "off" } else { "warn" });

    let config_path = cli.config.unwrap_or_else(DeckConfig::default_path);

    // Config commands must work even when the file no longer loads.
    let cmd = match cli.cmd {
        Command::Config { cmd } => return cmd_config::run(cmd, &config_path),
        cmd => cmd,
    };

    let deck = Deck::open(&config_path, cli.url)?;
    runtime()?.block_on(dispatch(cmd, &deck))
}

async fn dispatch(cmd: Command, deck: &Deck) -> anyhow::Result<()> {
    match cmd {
        Command::Tools { json } => cmd_tools::execute(deck, json).await,
        Command::Ask {
            text,
            tools,
            hours,
            out,
        } => cmd_ask::execute(deck, &text, &tools, hours, out.as_deref()).await,
        Command::History { all, search, json } => {
            cmd_history::execute(deck, all, search.as_deref(), json).await
        }
        Command::Show { index, out } => cmd_show::execute(deck, index, out.as_deref()).await,
        Command::Status { json } => cmd_status::execute(deck, json).await,
        Command::Watch => cmd_watch::execute(deck).await,
        Command::Export { index, out } => cmd_export::execute(deck, index, &out).await,
        Command::Config { cmd } => cmd_config::run(cmd, &deck.config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_collects_repeated_tools() {
        let cli = Cli::try_parse_from([
            "opsdeck", "ask", "login errors", "-t", "DD_Errors", "--tool", "Splunk_Search",
            "--hours", "12",
        ])
        .unwrap();
        match cli.cmd {
            Command::Ask { text, tools, hours, out } => {
                assert_eq!(text, "login errors");
                assert_eq!(tools, ["DD_Errors", "Splunk_Search"]);
                assert_eq!(hours, Some(12));
                assert!(out.is_none());
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "opsdeck", "status", "--json", "--url", "http://ops:5001", "--config", "/tmp/c.json",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://ops:5001"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.cmd, Command::Status { json: true }));
    }

    #[test]
    fn export_requires_out() {
        assert!(Cli::try_parse_from(["opsdeck", "export", "2"]).is_err());
    }

    #[test]
    fn url_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"backend_url":"http://file:1"}"#).unwrap();

        let deck = Deck::open(&path, None).unwrap();
        assert_eq!(deck.config.backend_url, "http://file:1");

        let deck = Deck::open(&path, Some("http://flag:2".into())).unwrap();
        assert_eq!(deck.config.backend_url, "http://flag:2");
    }
}
