//! Bitget USDT-perpetual market data source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::TtlCache;
use crate::data::{Bar, Market, Timeframe};

const BASE_URL: &str = "https://api.bitget.com";
const PRODUCT_TYPE: &str = "usdt-futures";
const SUCCESS_CODE: &str = "00000";

/// Configuration for the exchange client.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout, separate from the request timeout.
    pub connect_timeout: Duration,
    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// How long cached market lists and candle batches stay fresh.
    pub cache_ttl: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            user_agent: format!("breakout-scanner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors surfaced by a market data source.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The exchange answered with a non-success business code.
    #[error("exchange rejected the request: code {code}, {message}")]
    Api { code: String, message: String },

    /// The payload could not be interpreted.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// The server kept failing after all retries.
    #[error("server error {status} after {attempts} attempts")]
    ServerError { status: u16, attempts: u32 },
}

/// Read-only view of an exchange the scanner consumes.
#[async_trait]
pub trait MarketDataSource {
    /// Universe of active USDT-margined perpetual contracts.
    async fn list_markets(&self) -> Result<Vec<Market>, ExchangeError>;

    /// OHLCV history for one contract, oldest bar first.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError>;
}

/// Response envelope wrapping every Bitget v2 endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    msg: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ExchangeError> {
        if self.code != SUCCESS_CODE {
            return Err(ExchangeError::Api {
                code: self.code,
                message: self.msg,
            });
        }
        self.data
            .ok_or_else(|| ExchangeError::Payload("success response carried no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractInfo {
    symbol: String,
    base_coin: String,
    quote_coin: String,
    symbol_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerInfo {
    symbol: String,
    #[serde(default)]
    quote_volume: String,
}

/// Candle rows arrive as arrays of decimal strings:
/// `[ts, open, high, low, close, baseVolume, quoteVolume]`.
type CandleRow = Vec<String>;

/// Bitget REST source with retry, backoff and TTL-cached responses.
#[derive(Debug)]
pub struct BitgetSource {
    client: Client,
    config: SourceConfig,
    markets: TtlCache<(), Vec<Market>>,
    candles: TtlCache<(String, Timeframe, usize), Vec<Bar>>,
}

impl BitgetSource {
    pub fn new(config: SourceConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            markets: TtlCache::new(config.cache_ttl),
            candles: TtlCache::new(config.cache_ttl),
            config,
        })
    }

    /// Issues a GET, retries transient failures, and unwraps the envelope.
    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{BASE_URL}{path}");
        let mut attempts = 0;

        loop {
            match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    // Retry on server errors (5xx) and rate limiting (429).
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS
                    {
                        if attempts < self.config.max_retries {
                            attempts += 1;
                            tokio::time::sleep(self.backoff_delay(attempts)).await;
                            continue;
                        }
                        return Err(ExchangeError::ServerError {
                            status: response.status().as_u16(),
                            attempts,
                        });
                    }

                    let envelope: Envelope<T> = response.error_for_status()?.json().await?;
                    return envelope.into_data();
                }
                Err(e) if is_retryable_error(&e) && attempts < self.config.max_retries => {
                    attempts += 1;
                    tokio::time::sleep(self.backoff_delay(attempts)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Exponential backoff capped at the configured maximum delay.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(10);
        self.config
            .base_delay
            .saturating_mul(factor)
            .min(self.config.max_delay)
    }
}

#[async_trait]
impl MarketDataSource for BitgetSource {
    async fn list_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        if let Some(cached) = self.markets.get(&()) {
            return Ok(cached);
        }

        let product = [("productType", PRODUCT_TYPE.to_string())];
        let contracts: Vec<ContractInfo> = self
            .get_data("/api/v2/mix/market/contracts", &product)
            .await?;
        let tickers: Vec<TickerInfo> = self
            .get_data("/api/v2/mix/market/tickers", &product)
            .await?;

        let volumes: HashMap<String, f64> = tickers
            .into_iter()
            .map(|ticker| {
                let volume = ticker.quote_volume.parse().unwrap_or(0.0);
                (ticker.symbol, volume)
            })
            .collect();

        let markets: Vec<Market> = contracts
            .into_iter()
            .filter(|contract| {
                contract.quote_coin.eq_ignore_ascii_case("USDT")
                    && contract.symbol_status == "normal"
            })
            .map(|contract| Market {
                active: true,
                quote_volume_24h: volumes.get(&contract.symbol).copied().unwrap_or(0.0),
                symbol: contract.symbol,
                base: contract.base_coin,
                quote: contract.quote_coin,
            })
            .collect();

        self.markets.insert((), markets.clone());
        Ok(markets)
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let key = (symbol.to_string(), timeframe, limit);
        if let Some(cached) = self.candles.get(&key) {
            return Ok(cached);
        }

        let rows: Vec<CandleRow> = self
            .get_data(
                "/api/v2/mix/market/candles",
                &[
                    ("symbol", symbol.to_string()),
                    ("productType", PRODUCT_TYPE.to_string()),
                    ("granularity", timeframe.granularity().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let bars = parse_candles(rows)?;
        self.candles.insert(key, bars.clone());
        Ok(bars)
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_builder() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request()
}

fn parse_candles(rows: Vec<CandleRow>) -> Result<Vec<Bar>, ExchangeError> {
    let mut bars = Vec::with_capacity(rows.len());
    for row in &rows {
        bars.push(parse_candle(row)?);
    }
    bars.sort_by_key(|bar| bar.timestamp);
    validate_series(&bars)?;
    Ok(bars)
}

fn parse_candle(row: &[String]) -> Result<Bar, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Payload(format!(
            "candle row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let millis: i64 = row[0]
        .parse()
        .map_err(|_| field_error("timestamp", &row[0]))?;
    let timestamp = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| field_error("timestamp", &row[0]))?;

    Ok(Bar {
        timestamp,
        open: parse_price("open", &row[1])?,
        high: parse_price("high", &row[2])?,
        low: parse_price("low", &row[3])?,
        close: parse_price("close", &row[4])?,
        volume: parse_price("volume", &row[5])?,
    })
}

fn parse_price(field: &'static str, value: &str) -> Result<f64, ExchangeError> {
    let parsed: f64 = value.parse().map_err(|_| field_error(field, value))?;
    if !parsed.is_finite() {
        return Err(field_error(field, value));
    }
    Ok(parsed)
}

fn field_error(field: &str, value: &str) -> ExchangeError {
    ExchangeError::Payload(format!("cannot parse {field} from '{value}'"))
}

/// Rejects series that would corrupt index-aligned derived series.
pub fn validate_series(bars: &[Bar]) -> Result<(), ExchangeError> {
    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(ExchangeError::Payload(
                "bar timestamps must be strictly increasing".to_string(),
            ));
        }
    }
    Ok(())
}
