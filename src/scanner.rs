use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::analysis::breakout_signal;
use crate::config::LevelParams;
use crate::data::{LevelSignal, Timeframe};
use crate::exchange::MarketDataSource;

/// How the batch scan paces itself against the exchange.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub timeframe: Timeframe,
    /// Candles requested per market.
    pub limit: usize,
    /// Concurrent requests in flight.
    pub max_workers: usize,
    /// Symbols processed between pauses.
    pub chunk_size: usize,
    /// Pause between chunks.
    pub chunk_pause: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::Hour4,
            limit: 1000,
            max_workers: 8,
            chunk_size: 80,
            chunk_pause: Duration::from_millis(1200),
        }
    }
}

/// Result of scanning one instrument.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRow {
    pub symbol: String,
    pub outcome: ScanOutcome,
}

/// Signal or error marker; a failed fetch never aborts the batch.
#[derive(Debug, Clone, Serialize)]
pub enum ScanOutcome {
    Signal(LevelSignal),
    Failed(String),
}

/// Scan every symbol against the configured level parameters.
///
/// Requests run `max_workers` at a time, and the symbol list is walked in
/// chunks with a pause between them so the exchange's rate limits hold.
/// Results arrive in completion order.
pub async fn scan_universe<S>(
    source: &S,
    symbols: &[String],
    params: &LevelParams,
    options: &ScanOptions,
    progress: &ProgressBar,
) -> Vec<ScanRow>
where
    S: MarketDataSource + Sync,
{
    let mut rows = Vec::with_capacity(symbols.len());
    let chunk_size = options.chunk_size.max(1);

    for (chunk_index, chunk) in symbols.chunks(chunk_size).enumerate() {
        if chunk_index > 0 && !options.chunk_pause.is_zero() {
            tokio::time::sleep(options.chunk_pause).await;
        }

        let batch: Vec<ScanRow> = stream::iter(chunk)
            .map(|symbol| scan_symbol(source, symbol, params, options))
            .buffer_unordered(options.max_workers.max(1))
            .inspect(|_| progress.inc(1))
            .collect()
            .await;
        rows.extend(batch);
    }
    rows
}

async fn scan_symbol<S>(
    source: &S,
    symbol: &str,
    params: &LevelParams,
    options: &ScanOptions,
) -> ScanRow
where
    S: MarketDataSource + Sync,
{
    let outcome = match source
        .fetch_ohlcv(symbol, options.timeframe, options.limit)
        .await
    {
        Ok(bars) => ScanOutcome::Signal(breakout_signal(&bars, params)),
        Err(err) => ScanOutcome::Failed(err.to_string()),
    };
    ScanRow {
        symbol: symbol.to_string(),
        outcome,
    }
}
