//! footcache - cached, normalized access to football statistics
//!
//! Resolves squads, standings, fixtures and match data through a TTL cache
//! and prints the normalized record as JSON.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use footcache::cache::ReclaimMessage;
use footcache::cli::{Cli, Command};
use footcache::config::CacheConfig;
use footcache::{make_key, normalize, FetchOutcome, FootballCache};

/// Sets up stderr logging; `RUST_LOG` overrides the verbosity flags
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "footcache=warn",
        1 => "footcache=info",
        _ => "footcache=debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CacheConfig::from_cli(&cli);

    match cli.command {
        Command::Resolve { entity, parts } => {
            let key = make_key(entity, &parts)?;
            let cache = FootballCache::from_config(&config)?;

            match cache.resolve_key(&key).await {
                FetchOutcome::Fresh(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                FetchOutcome::Unpersisted { payload, reason } => {
                    // The data is good, but the cache is broken; say so through the exit status
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                    return Err(reason.into());
                }
                FetchOutcome::StaleFallback { payload, reason } => {
                    eprintln!("warning: serving stale data for {}: {}", key, reason);
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                FetchOutcome::Failure(e) => return Err(e.into()),
            }
        }
        Command::Invalidate { entity, parts } => {
            let key = make_key(entity, &parts)?;
            FootballCache::from_config(&config)?.invalidate(&key)?;
            println!("Invalidated {}", key);
        }
        Command::Purge { watch, .. } => {
            let cache = FootballCache::from_config(&config)?;
            let removed = cache.purge_expired()?;
            println!("Purged {} expired entries", removed);

            if watch {
                let mut reclaimer = cache.spawn_reclaimer();
                loop {
                    tokio::select! {
                        message = reclaimer.receiver.recv() => match message {
                            Some(ReclaimMessage::Reclaimed(removed)) => {
                                println!("Purged {} expired entries", removed);
                            }
                            Some(ReclaimMessage::ReclaimFailed(e)) => {
                                eprintln!("warning: purge failed: {}", e);
                            }
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
                reclaimer.shutdown().await;
            }
        }
        Command::Normalize { entity, file } => {
            let content = std::fs::read_to_string(&file)?;
            let raw: serde_json::Value = serde_json::from_str(&content)?;
            let record = normalize(entity, &raw)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
