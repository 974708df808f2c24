use crate::analysis::{cluster_last_level, compute_atr, detect_pivots};
use crate::config::LevelParams;
use crate::data::{Bar, CandidateLevel, LevelSignal, Side, SignalStatus};

/// Classify the latest close against a candidate level.
///
/// A breakout requires the close strictly beyond the level in the scanned
/// direction; a close exactly at the level is a touch, not a break. Levels
/// with fewer than `min_touches` touches keep the no-level status but still
/// report their numbers.
pub fn classify(
    candidate: Option<CandidateLevel>,
    close: f64,
    min_touches: u32,
    side: Side,
) -> LevelSignal {
    let Some(candidate) = candidate else {
        return LevelSignal::no_level();
    };

    let distance = match side {
        Side::Resistance => close - candidate.price,
        Side::Support => candidate.price - close,
    };
    let status = if candidate.touches < min_touches {
        SignalStatus::NoLevel
    } else {
        let beyond = match side {
            Side::Resistance => close > candidate.price,
            Side::Support => close < candidate.price,
        };
        if beyond {
            SignalStatus::Breakout
        } else {
            SignalStatus::Near
        }
    };
    LevelSignal {
        status,
        live_level: Some(candidate.price),
        live_touches: candidate.touches,
        candidate: Some(candidate),
        distance: Some(distance),
    }
}

/// Evaluate one price series end to end.
///
/// The latest ATR value scaled by the tolerance fraction sets the clustering
/// tolerance, pivots are detected on the side's price sub-series, the most
/// recent run of pivots is merged into a candidate level, and the latest
/// close is classified against it.
pub fn breakout_signal(bars: &[Bar], params: &LevelParams) -> LevelSignal {
    params.assert_valid();

    let Some(last) = bars.last() else {
        return LevelSignal::no_level();
    };

    let atr = compute_atr(bars, params.atr_length);
    let tolerance = atr.last().copied().unwrap_or(0.0) * params.tolerance_fraction;

    let values: Vec<f64> = match params.side {
        Side::Resistance => bars.iter().map(|bar| bar.high).collect(),
        Side::Support => bars.iter().map(|bar| bar.low).collect(),
    };
    let pivots = detect_pivots(
        &values,
        params.pivot_left,
        params.pivot_right,
        params.side.pivot_mode(),
    );
    let candidate = cluster_last_level(&pivots, tolerance, params.max_gap_bars, params.side);
    classify(candidate, last.close, params.min_touches, params.side)
}
