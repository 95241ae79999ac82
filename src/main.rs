//! oceanbook - demo binary.
//!
//! Starts one book per configured symbol, runs a short scripted session
//! against the first one and prints every trade as JSON.
//!
//! ```bash
//! cargo run -- --config oceanbook.toml
//! LOG_FORMAT=json RUST_LOG=oceanbook=debug cargo run
//! ```

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use oceanbook::logging::init_logging;
use oceanbook::{EngineConfig, Exchange, Order, Side};

#[derive(Debug, Parser)]
#[command(name = "oceanbook", version, about = "Price-time priority matching core demo")]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the top N depth levels after the session
    #[arg(long, default_value_t = 5)]
    depth: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.log = config.log.merge_env();
    init_logging(&config.log)?;

    let exchange = Exchange::start(&config)?;
    let symbol = config.symbols.first().cloned().ok_or("no symbols configured")?;
    info!(symbol = %symbol, "running demo session");

    for order in demo_orders(&symbol) {
        let result = exchange.submit(order).await?;
        for trade in &result.trades {
            println!("{}", serde_json::to_string(trade)?);
        }
        info!(
            order_id = result.order_id,
            disposition = ?result.disposition,
            triggered = ?result.triggered,
            "order processed"
        );
    }

    let depth = exchange.depth(&symbol, args.depth).await?;
    println!("{}", serde_json::to_string_pretty(&depth)?);
    println!("state root: {}", exchange.state_root(&symbol).await?);

    exchange.shutdown().await;
    Ok(())
}

/// A resting book, a crossing buy, a sell stop and the sell that fires it
fn demo_orders(symbol: &str) -> Vec<Order> {
    let now = Utc::now();
    let px = |p: i64| Decimal::new(p, 0);
    let qty = |q: i64| Decimal::new(q, 1);

    vec![
        Order::limit(1, symbol, 100, Side::Sell, px(101), qty(10), now),
        Order::limit(2, symbol, 100, Side::Sell, px(102), qty(20), now),
        Order::limit(3, symbol, 200, Side::Buy, px(99), qty(15), now),
        Order::limit(4, symbol, 200, Side::Buy, px(98), qty(30), now),
        Order::limit(5, symbol, 300, Side::Buy, px(102), qty(15), now),
        Order::market(6, symbol, 400, Side::Sell, qty(10), now).with_stop_price(px(99)),
        Order::limit(7, symbol, 500, Side::Sell, px(99), qty(5), now).immediate_or_cancel(),
    ]
}
