use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Single OHLCV bar sampled at a uniform interval.
#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Kind of local extreme the pivot detector confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PivotMode {
    High,
    Low,
}

/// Confirmed local extreme in a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
}

/// Side of price action a scan evaluates: resistance levels broken upward,
/// support levels broken downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Resistance,
    Support,
}

impl Side {
    /// Pivot kind this side clusters: highs for resistance, lows for support.
    pub const fn pivot_mode(self) -> PivotMode {
        match self {
            Self::Resistance => PivotMode::High,
            Self::Support => PivotMode::Low,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resistance => "resistance",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resistance" | "res" | "r" => Ok(Self::Resistance),
            "support" | "sup" | "s" => Ok(Self::Support),
            _ => Err(ParseSideError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSideError(String);

impl fmt::Display for ParseSideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown side '{}', expected resistance or support", self.0)
    }
}

impl std::error::Error for ParseSideError {}

/// Price level produced by clustering the most recent pivots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateLevel {
    pub price: f64,
    pub touches: u32,
    /// Bar index of the newest pivot absorbed into the cluster.
    pub last_touch_bar: usize,
}

/// Classification of the latest close against the candidate level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalStatus {
    Breakout,
    Near,
    NoLevel,
}

impl SignalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breakout => "breakout",
            Self::Near => "near",
            Self::NoLevel => "no-level",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one price series against its candidate level.
///
/// `live_level`, `live_touches` and `distance` repeat the candidate's numbers
/// so a report row is readable without unpacking the candidate itself. They
/// are populated whenever a candidate exists, whatever the status says.
#[derive(Debug, Clone, Serialize)]
pub struct LevelSignal {
    pub status: SignalStatus,
    pub live_level: Option<f64>,
    pub live_touches: u32,
    pub candidate: Option<CandidateLevel>,
    /// Signed distance from the latest close to the level; positive in the
    /// breakout direction for the scanned side.
    pub distance: Option<f64>,
}

impl LevelSignal {
    /// Signal for a series where no level could be established.
    pub const fn no_level() -> Self {
        Self {
            status: SignalStatus::NoLevel,
            live_level: None,
            live_touches: 0,
            candidate: None,
            distance: None,
        }
    }
}

/// Bar interval supported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Timeframe {
    Hour1,
    Hour4,
    Day1,
}

impl Timeframe {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// Granularity token the exchange's candle endpoint expects.
    pub const fn granularity(self) -> &'static str {
        match self {
            Self::Hour1 => "1H",
            Self::Hour4 => "4H",
            Self::Day1 => "1D",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1h" | "h1" => Ok(Self::Hour1),
            "4h" | "h4" => Ok(Self::Hour4),
            "1d" | "d1" | "daily" => Ok(Self::Day1),
            _ => Err(ParseTimeframeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeframeError(String);

impl fmt::Display for ParseTimeframeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported timeframe '{}', expected 1h, 4h or 1d", self.0)
    }
}

impl std::error::Error for ParseTimeframeError {}

/// Tradable instrument from the exchange universe.
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub active: bool,
    pub quote_volume_24h: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_aliases_case_insensitively() {
        assert_eq!("resistance".parse::<Side>().unwrap(), Side::Resistance);
        assert_eq!("RES".parse::<Side>().unwrap(), Side::Resistance);
        assert_eq!("s".parse::<Side>().unwrap(), Side::Support);
        assert!("diagonal".parse::<Side>().is_err());
    }

    #[test]
    fn side_selects_matching_pivot_mode() {
        assert_eq!(Side::Resistance.pivot_mode(), PivotMode::High);
        assert_eq!(Side::Support.pivot_mode(), PivotMode::Low);
    }

    #[test]
    fn timeframe_round_trips_through_display() {
        for timeframe in [Timeframe::Hour1, Timeframe::Hour4, Timeframe::Day1] {
            let parsed: Timeframe = timeframe.to_string().parse().unwrap();
            assert_eq!(parsed, timeframe);
        }
    }

    #[test]
    fn timeframe_maps_to_exchange_granularity() {
        assert_eq!(Timeframe::Hour1.granularity(), "1H");
        assert_eq!(Timeframe::Hour4.granularity(), "4H");
        assert_eq!(Timeframe::Day1.granularity(), "1D");
    }

    #[test]
    fn timeframe_rejects_unknown_intervals() {
        assert!("15m".parse::<Timeframe>().is_err());
        assert!("1w".parse::<Timeframe>().is_err());
    }

    #[test]
    fn no_level_signal_has_empty_fields() {
        let signal = LevelSignal::no_level();
        assert_eq!(signal.status, SignalStatus::NoLevel);
        assert!(signal.live_level.is_none());
        assert_eq!(signal.live_touches, 0);
        assert!(signal.candidate.is_none());
        assert!(signal.distance.is_none());
    }
}
