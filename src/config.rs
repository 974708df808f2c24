use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::data::{Side, Timeframe};
use crate::scanner::ScanOptions;

/// Level-detection parameters for one side of price action.
#[derive(Debug, Clone)]
pub struct LevelParams {
    pub pivot_left: usize,
    pub pivot_right: usize,
    pub atr_length: usize,
    /// Clustering tolerance as a fraction of the latest ATR value.
    pub tolerance_fraction: f64,
    /// Touches required before a level is tradable.
    pub min_touches: u32,
    /// Maximum bars between neighboring touches of one level.
    pub max_gap_bars: usize,
    pub side: Side,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            pivot_left: 3,
            pivot_right: 3,
            atr_length: 14,
            tolerance_fraction: 0.15,
            min_touches: 3,
            max_gap_bars: 120,
            side: Side::Resistance,
        }
    }
}

impl LevelParams {
    /// Panics on malformed parameters. Zero windows or lengths would yield
    /// silently wrong numbers, so they are rejected before any math runs.
    pub fn assert_valid(&self) {
        assert!(self.pivot_left >= 1, "pivot_left must be >= 1");
        assert!(self.pivot_right >= 1, "pivot_right must be >= 1");
        assert!(self.atr_length >= 1, "atr_length must be >= 1");
        assert!(
            self.tolerance_fraction.is_finite() && self.tolerance_fraction >= 0.0,
            "tolerance_fraction must be finite and non-negative"
        );
        assert!(self.min_touches >= 1, "min_touches must be >= 1");
        assert!(self.max_gap_bars >= 1, "max_gap_bars must be >= 1");
    }
}

/// Command-line configuration for the breakout scanner.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Bar interval to scan: 1h, 4h or 1d.
    #[arg(long, default_value_t = Timeframe::Hour4)]
    pub timeframe: Timeframe,

    /// Side of price action to scan: resistance or support.
    #[arg(long, default_value_t = Side::Resistance)]
    pub side: Side,

    /// Restrict the scan to the N most liquid markets by 24h quote volume.
    /// By default every active USDT perpetual is scanned.
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Candles fetched per market (the exchange caps a batch at 1000).
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub limit: u64,

    /// Pivot confirmation bars to the left of a candidate extreme.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub pivot_left: u64,

    /// Pivot confirmation bars to the right of a candidate extreme.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub pivot_right: u64,

    /// ATR length for volatility estimation.
    #[arg(long, default_value_t = 14, value_parser = clap::value_parser!(u64).range(1..))]
    pub atr_length: u64,

    /// Clustering tolerance as a fraction of the latest ATR.
    #[arg(long, default_value_t = 0.15, value_parser = parse_fraction)]
    pub tolerance: f64,

    /// Touches required before a level counts as tradable.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub min_touches: u32,

    /// Maximum bars between neighboring touches of one level.
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_gap_bars: u64,

    /// Concurrent requests in flight.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: u64,

    /// Symbols processed between rate-limit pauses.
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    /// Pause between chunks, in seconds.
    #[arg(long, default_value_t = 1.2, value_parser = parse_fraction)]
    pub chunk_pause: f64,

    /// How long cached exchange responses stay fresh, in seconds.
    #[arg(long, default_value_t = 300)]
    pub cache_ttl: u64,

    /// Write the scan results to a CSV file.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if parsed.is_finite() && parsed >= 0.0 {
        Ok(parsed)
    } else {
        Err("value must be finite and non-negative".to_string())
    }
}

impl AppConfig {
    pub fn level_params(&self) -> LevelParams {
        LevelParams {
            pivot_left: self.pivot_left as usize,
            pivot_right: self.pivot_right as usize,
            atr_length: self.atr_length as usize,
            tolerance_fraction: self.tolerance,
            min_touches: self.min_touches,
            max_gap_bars: self.max_gap_bars as usize,
            side: self.side,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            timeframe: self.timeframe,
            limit: self.limit as usize,
            max_workers: self.workers as usize,
            chunk_size: self.chunk_size as usize,
            chunk_pause: Duration::from_secs_f64(self.chunk_pause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_level_params() {
        let config = AppConfig::parse_from(["breakout-scanner"]);
        let params = config.level_params();
        assert_eq!(params.pivot_left, 3);
        assert_eq!(params.pivot_right, 3);
        assert_eq!(params.atr_length, 14);
        assert_eq!(params.tolerance_fraction, 0.15);
        assert_eq!(params.min_touches, 3);
        assert_eq!(params.max_gap_bars, 120);
        assert_eq!(params.side, Side::Resistance);
    }

    #[test]
    fn defaults_match_scan_options() {
        let config = AppConfig::parse_from(["breakout-scanner"]);
        let options = config.scan_options();
        assert_eq!(options.timeframe, Timeframe::Hour4);
        assert_eq!(options.limit, 1000);
        assert_eq!(options.max_workers, 8);
        assert_eq!(options.chunk_size, 80);
        assert_eq!(options.chunk_pause, Duration::from_secs_f64(1.2));
    }

    #[test]
    fn rejects_zero_windows() {
        assert!(AppConfig::try_parse_from(["breakout-scanner", "--pivot-left", "0"]).is_err());
        assert!(AppConfig::try_parse_from(["breakout-scanner", "--min-touches", "0"]).is_err());
        assert!(AppConfig::try_parse_from(["breakout-scanner", "--max-gap-bars", "0"]).is_err());
    }

    #[test]
    fn rejects_negative_tolerance() {
        assert!(AppConfig::try_parse_from(["breakout-scanner", "--tolerance", "-0.1"]).is_err());
    }

    #[test]
    fn rejects_oversized_limit() {
        assert!(AppConfig::try_parse_from(["breakout-scanner", "--limit", "1500"]).is_err());
    }

    #[test]
    fn parses_side_and_timeframe() {
        let config = AppConfig::parse_from([
            "breakout-scanner",
            "--side",
            "support",
            "--timeframe",
            "1d",
        ]);
        assert_eq!(config.side, Side::Support);
        assert_eq!(config.timeframe, Timeframe::Day1);
    }

    #[test]
    #[should_panic(expected = "min_touches")]
    fn zero_min_touches_fails_validation() {
        let params = LevelParams {
            min_touches: 0,
            ..LevelParams::default()
        };
        params.assert_valid();
    }
}
