//! Example: follow a chain head and print every block added to (or removed from) it.
//!
//! Usage:
//!
//!   cargo run -p blocktracker --example blocktracker -- --endpoint <HTTP_URL> [--reconcile] [--interval <SECS>]
//!
//! Options:
//!   --reconcile        Report added/removed blocks across reorgs and gaps (default: bare heads).
//!   --interval <SECS>  Poll interval in whole seconds, at least 1. Default: 4.
//!   --json             Print one JSON line per event instead of text.

use blocktracker::{BlockTracker, RpcClient, TrackerEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8545";

const USAGE: &str = "Usage: blocktracker --endpoint <HTTP_URL> [--reconcile] [--interval SECS] [--json]\n\
     Prints one line per block added to or removed from the chain head.\n\
     --reconcile  Track reorgs and backfill gaps (default: print bare heads).\n\
     --interval   Poll interval in whole seconds, at least 1. Default: 4.\n\
     --json       Print one JSON line per event.";

#[derive(Debug, PartialEq)]
struct Options {
    endpoint: String,
    reconcile: bool,
    json: bool,
    interval: u64,
}

#[derive(Debug, PartialEq)]
enum Cli {
    Run(Options),
    Help,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut opts = Options {
        endpoint: DEFAULT_ENDPOINT.to_string(),
        reconcile: false,
        json: false,
        interval: 4,
    };
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--endpoint" => {
                opts.endpoint = args
                    .next()
                    .filter(|s| !s.is_empty())
                    .ok_or("--endpoint needs a URL")?
                    .clone();
            }
            "--reconcile" => opts.reconcile = true,
            "--json" => opts.json = true,
            "--interval" => {
                let value = args.next().ok_or("--interval needs a value")?;
                opts.interval = match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => secs,
                    _ => return Err(format!("invalid --interval {value:?}")),
                };
            }
            "--help" | "-h" => return Ok(Cli::Help),
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(Cli::Run(opts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Options {
        endpoint,
        reconcile,
        json,
        interval,
    } = match parse_args(&args) {
        Ok(Cli::Run(opts)) => opts,
        Ok(Cli::Help) => {
            eprintln!("{USAGE}");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let client = Arc::new(RpcClient::from_url(&endpoint)?);
    let (tracker, mut events) = BlockTracker::builder(client)
        .reconcile(reconcile)
        .poll_interval(Duration::from_secs(interval))
        .build()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tracker.start(shutdown_rx);
    tracing::info!(%endpoint, reconcile, "tracking chain head");

    loop {
        tokio::select! {
            Some(ev) = events.recv() => {
                if json {
                    println!("{}", serde_json::to_string(&ev)?);
                    continue;
                }
                if let TrackerEvent::Reconciled(_) = &ev {
                    for b in ev.removed() {
                        println!("- {}: {}", b.number, b.hash);
                    }
                }
                for b in ev.added() {
                    println!("{}: {}", b.number, b.hash);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("caught interrupt, shutting down");
                break;
            }
        }
    }
    let _ = shutdown_tx.send(true);
    drop(events);
    let _ = task.await;
    Ok(())
}
