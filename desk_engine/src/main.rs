//! Interactive trading desk for Binance USDT-M Futures.
//!
//! Presentation glue only: reads line commands, forwards each trigger to
//! the order engine, and renders the typed result or error verbatim.
//!
//! COMMANDS:
//!   pairs [filter]        list tradable pairs (optionally filtered)
//!   price <symbol>        current price
//!   long <symbol> <usdt>  open with upward-bias intent, sized by notional
//!   short <symbol> <usdt> open with downward-bias intent
//!   close <symbol>        flatten the position (reduce-only)
//!   account               balance, open positions, total pnl
//!   quit

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use desk_engine::config::AppConfig;
use desk_engine::models::{CloseOutcome, Intent, PlacedOrder};
use desk_engine::{BinanceGateway, ExchangeGateway, OrderEngine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env()?;
    if !cfg.use_testnet {
        warn!("LIVE MODE -- real funds at risk, check every order twice");
    }

    info!("manual futures desk starting ({})", cfg.rest_url);

    let gateway = BinanceGateway::new(&cfg)?;
    let server_time = gateway.server_time().await?;
    info!(server_time, "connected to exchange");

    let engine = OrderEngine::new(gateway, &cfg);

    print_snapshot(&engine).await;
    println!("Type 'help' for commands.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => {}
            ["help"] => print_help(),
            ["quit"] | ["exit"] => break,
            ["pairs"] => list_pairs(&engine, None).await,
            ["pairs", filter] => list_pairs(&engine, Some(filter)).await,
            ["price", symbol] => {
                let symbol = symbol.to_ascii_uppercase();
                match engine.symbol_price(&symbol).await {
                    Ok(price) => println!("{symbol}: {price}"),
                    Err(e) => error!("{e}"),
                }
            }
            ["long", symbol, amount] => {
                trigger_order(&engine, symbol, amount, Intent::Long).await
            }
            ["short", symbol, amount] => {
                trigger_order(&engine, symbol, amount, Intent::Short).await
            }
            ["close", symbol] => {
                let symbol = symbol.to_ascii_uppercase();
                match engine.close_position(&symbol).await {
                    Ok(CloseOutcome::Flat) => println!("nothing to close for {symbol}"),
                    Ok(CloseOutcome::Closed(placed)) => {
                        print_placed(&placed);
                        print_snapshot(&engine).await;
                    }
                    Err(e) => error!("close failed: {e}"),
                }
            }
            ["account"] => print_snapshot(&engine).await,
            _ => println!("unrecognized command, try 'help'"),
        }
    }

    info!("desk shut down");
    Ok(())
}

fn print_help() {
    println!("pairs [filter]         list tradable pairs");
    println!("price <symbol>         current price");
    println!("long <symbol> <usdt>   open, upward-bias intent");
    println!("short <symbol> <usdt>  open, downward-bias intent");
    println!("close <symbol>         flatten position (reduce-only)");
    println!("account                balance / positions / pnl");
    println!("quit                   exit");
}

async fn trigger_order<G: ExchangeGateway>(
    engine: &OrderEngine<G>,
    symbol: &str,
    amount: &str,
    intent: Intent,
) {
    let symbol = symbol.to_ascii_uppercase();
    let notional: Decimal = match amount.parse() {
        Ok(n) => n,
        Err(_) => {
            println!("amount {amount:?} is not a number");
            return;
        }
    };
    match engine.place_order(&symbol, notional, intent).await {
        Ok(placed) => {
            print_placed(&placed);
            print_snapshot(engine).await;
        }
        Err(e) => error!("order failed: {e}"),
    }
}

fn print_placed(placed: &PlacedOrder) {
    let avg = placed
        .ack
        .avg_price
        .map(|p| p.to_string())
        .unwrap_or_else(|| "n/a".into());
    println!(
        "{} {} qty={}{} -> id={} status={} filled={} avg={}",
        placed.order.side,
        placed.order.symbol,
        placed.order.quantity,
        if placed.order.reduce_only { " (reduce-only)" } else { "" },
        placed.ack.order_id,
        placed.ack.status,
        placed.ack.executed_qty,
        avg,
    );
}

async fn list_pairs<G: ExchangeGateway>(engine: &OrderEngine<G>, filter: Option<&str>) {
    match engine.trading_pairs().await {
        Ok(pairs) => {
            let needle = filter.map(|f| f.to_ascii_uppercase());
            let matching: Vec<_> = pairs
                .iter()
                .filter(|p| needle.as_deref().map_or(true, |n| p.contains(n)))
                .collect();
            for pair in matching.iter().take(40) {
                println!("{pair}");
            }
            if matching.len() > 40 {
                println!("... {} more", matching.len() - 40);
            }
        }
        Err(e) => error!("pair listing failed: {e}"),
    }
}

async fn print_snapshot<G: ExchangeGateway>(engine: &OrderEngine<G>) {
    match engine.refresh_snapshot().await {
        Ok(snapshot) => {
            println!("balance: {} USDT", snapshot.balance_usdt);
            if snapshot.positions.is_empty() {
                println!("positions: none");
            } else {
                for p in &snapshot.positions {
                    let pnl = p
                        .unrealized_pnl
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "n/a".into());
                    println!("  {}: {} @ {} (pnl {})", p.symbol, p.amount, p.entry_price, pnl);
                }
            }
            println!("total pnl: {} USDT", snapshot.total_pnl);
        }
        // State unknown, not stale-but-valid; say so instead of showing
        // the previous numbers.
        Err(e) => error!("{e}"),
    }
}
