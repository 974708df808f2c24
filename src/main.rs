mod analysis;
mod cache;
mod config;
mod data;
mod exchange;
mod output;
mod scanner;

use std::cmp::Ordering;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;

use config::AppConfig;
use data::Market;
use exchange::{BitgetSource, MarketDataSource, SourceConfig};
use output::{print_report, sorted_rows, write_csv};
use scanner::scan_universe;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();
    run(&config).await
}

async fn run(config: &AppConfig) -> Result<()> {
    let params = config.level_params();
    let options = config.scan_options();

    let source = BitgetSource::new(SourceConfig {
        cache_ttl: Duration::from_secs(config.cache_ttl),
        ..SourceConfig::default()
    })
    .context("failed to build the exchange client")?;

    let markets = source
        .list_markets()
        .await
        .context("failed to load the market universe")?;
    if markets.is_empty() {
        bail!("the exchange returned no active USDT perpetuals");
    }

    let symbols = pick_symbols(&markets, config.top_n);
    println!(
        "Scanning {} of {} markets on {} ({} side)",
        symbols.len(),
        markets.len(),
        options.timeframe,
        params.side
    );

    let progress = ProgressBar::new(symbols.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("=>-"),
    );

    let rows = scan_universe(&source, &symbols, &params, &options, &progress).await;
    progress.finish_and_clear();

    let rows = sorted_rows(rows);
    print_report(&rows);

    if let Some(path) = &config.output {
        write_csv(&rows, path)?;
        println!("Results written to {}", path.display());
    }

    Ok(())
}

/// Selects the symbols to scan, most liquid first when a cap applies.
fn pick_symbols(markets: &[Market], top_n: Option<usize>) -> Vec<String> {
    match top_n {
        None => markets.iter().map(|market| market.symbol.clone()).collect(),
        Some(n) => markets
            .iter()
            .sorted_by(|a, b| {
                b.quote_volume_24h
                    .partial_cmp(&a.quote_volume_24h)
                    .unwrap_or(Ordering::Equal)
            })
            .take(n)
            .map(|market| market.symbol.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(symbol: &str, volume: f64) -> Market {
        Market {
            symbol: symbol.to_string(),
            base: symbol.trim_end_matches("USDT").to_string(),
            quote: "USDT".to_string(),
            active: true,
            quote_volume_24h: volume,
        }
    }

    #[test]
    fn cap_picks_most_liquid_first() {
        let markets = vec![
            market("DOGEUSDT", 5.0e6),
            market("BTCUSDT", 9.0e8),
            market("ETHUSDT", 4.0e8),
        ];
        let symbols = pick_symbols(&markets, Some(2));
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn no_cap_keeps_exchange_order() {
        let markets = vec![market("DOGEUSDT", 5.0e6), market("BTCUSDT", 9.0e8)];
        let symbols = pick_symbols(&markets, None);
        assert_eq!(symbols, vec!["DOGEUSDT", "BTCUSDT"]);
    }

    #[test]
    fn cap_larger_than_universe_keeps_everything() {
        let markets = vec![market("DOGEUSDT", 5.0e6), market("BTCUSDT", 9.0e8)];
        let symbols = pick_symbols(&markets, Some(10));
        assert_eq!(symbols.len(), 2);
    }
}
