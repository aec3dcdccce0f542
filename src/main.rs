//! advert-notifier: binary entrypoint.
//! Loads config, opens the advert store, and runs one scan or the interval loop.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use advert_notifier::config::load_config;
use advert_notifier::extract::portals::PortalRegistry;
use advert_notifier::extract::PageExtractor;
use advert_notifier::notify::WebhookNotifier;
use advert_notifier::shutdown::spawn_signal_watcher;
use advert_notifier::{AdvertStore, Mode, Scanner, SqliteStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run one scan over every configured target, then exit
    #[arg(long, conflicts_with = "interval")]
    collect: bool,

    /// Scan every N seconds until SIGINT/SIGTERM
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Config file (default: $ADVERT_NOTIFIER_CONFIG, then config/notifier.{toml,yaml,json})
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        match (self.collect, self.interval) {
            (true, _) => Some(Mode::Collect),
            (false, Some(secs)) => Some(Mode::Interval(Duration::from_secs(secs))),
            (false, None) => None,
        }
    }
}

/// `RUST_LOG` wins; otherwise `--debug` picks between two defaults.
fn init_tracing(debug: bool) {
    let default = if debug {
        "advert_notifier=debug,info"
    } else {
        "advert_notifier=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_scanner(cli: &Cli) -> Result<Scanner> {
    let cfg = load_config(cli.config.as_deref()).context("loading configuration")?;
    cfg.validate(&PortalRegistry::builtin())
        .context("validating configuration")?;

    let store = SqliteStore::open(&cfg.database_path)
        .with_context(|| format!("opening advert store {}", cfg.database_path.display()))?;
    tracing::info!(
        path = %cfg.database_path.display(),
        known = store.count().unwrap_or_default(),
        "advert store ready"
    );

    let extractor = PageExtractor::new(cfg.request_timeout(), cfg.user_agent.as_deref())
        .context("building http client")?;
    let notifier = WebhookNotifier::new(cfg.webhook_url.clone())
        .with_flavor(cfg.webhook_flavor)
        .with_timeout(cfg.request_timeout());

    Ok(Scanner::new(
        cfg.sources(),
        Box::new(extractor),
        Box::new(store),
        Box::new(notifier),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(mode) = cli.mode() else {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::from(2);
    };

    // Load .env if present; secrets such as the webhook URL may live there.
    let _ = dotenvy::dotenv();
    init_tracing(cli.debug);

    let scanner = match build_scanner(&cli) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("startup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_watcher(shutdown.clone());

    let cycles = scanner.run(mode, &shutdown).await;
    tracing::info!(cycles, "done");
    ExitCode::SUCCESS
}
