//! Protocol metrics replay harness
//!
//! Reads a JSONL feed of `{transaction, event, snapshot}` lines and drives
//! the derivation engine over them in order, printing a summary of the
//! derived records. Run with: cargo run -- --feed feed.jsonl

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use console::style;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod chain;
mod config;
mod dates;
mod decimals;
mod discounts;
mod engine;
mod entities;
mod errors;
mod events;
mod holders;
mod metrics;
mod price;
mod store;

use chain::SnapshotChain;
use config::Config;
use engine::Engine;
use events::FeedLine;
use store::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "squid-metrics", about = "Derive protocol metrics from a replay feed")]
struct Args {
    /// JSONL feed of transaction events with their chain snapshots
    #[arg(long)]
    feed: PathBuf,

    /// Optional TOML config overriding the mainnet deployment defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the full derived store as JSON to stdout after the replay
    #[arg(long)]
    dump: bool,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🦑 SQUID METRICS - Protocol Metrics Derivation Engine").cyan().bold()
    );
    println!(
        "{}",
        style("    Treasury RFV | APY & Runway | Bond Discounts | Holders").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("squid_metrics=info".parse()?),
        )
        .init();

    print_banner();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;
    info!(
        "tracking {} bond markets, reserve asset {}",
        config.bond_markets.len(),
        config.reserve_symbol
    );

    let feed = File::open(&args.feed)
        .wrap_err_with(|| format!("opening feed {}", args.feed.display()))?;
    let mut engine = Engine::new(config, SnapshotChain::new(), MemoryStore::new());

    let mut processed = 0usize;
    for (line_no, line) in BufReader::new(feed).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: FeedLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("skipping malformed feed line {}: {e}", line_no + 1);
                continue;
            }
        };

        // each line carries the chain state observed at its transaction
        engine.chain = parsed.snapshot;
        engine.process(&parsed.transaction, &parsed.event);
        processed += 1;
    }

    info!("processed {processed} events");
    println!(
        "{} {}",
        style("derived records:").green().bold(),
        engine.store.record_counts()
    );

    for pm in engine.store.metrics() {
        println!(
            "  {}  price ${}  mv ${}  rfv ${}  apy {}%  holders {}",
            dates::bucket_label(pm.id),
            pm.token_price,
            pm.treasury_market_value,
            pm.treasury_risk_free_value,
            pm.current_apy,
            pm.holders
        );
    }

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&engine.store)?);
    }

    Ok(())
}
