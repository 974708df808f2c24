use crate::data::Bar;

/// Compute the true range of every bar.
///
/// The true range is the largest of high minus low, |high minus previous
/// close| and |low minus previous close|. The first bar has no previous
/// close, so its true range is just high minus low.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut ranges = Vec::with_capacity(bars.len());
    for (idx, bar) in bars.iter().enumerate() {
        let tr = if idx == 0 {
            bar.high - bar.low
        } else {
            let prev = &bars[idx - 1];
            let high_low = bar.high - bar.low;
            let high_close = (bar.high - prev.close).abs();
            let low_close = (bar.low - prev.close).abs();
            high_low.max(high_close).max(low_close)
        };
        ranges.push(tr);
    }
    ranges
}

/// Compute a simple rolling-mean Average True Range series.
///
/// Each value is the mean of the last `length` true ranges. Early indices
/// average over however many samples exist so far, so the output is defined
/// at every index and has the same length as the input.
pub fn compute_atr(bars: &[Bar], length: usize) -> Vec<f64> {
    assert!(length >= 1, "ATR length must be at least 1");

    let true_ranges = true_range(bars);
    let mut atr_values = Vec::with_capacity(true_ranges.len());
    let mut window_sum = 0.0;
    for (idx, &tr) in true_ranges.iter().enumerate() {
        window_sum += tr;
        if idx >= length {
            window_sum -= true_ranges[idx - length];
        }
        let samples = (idx + 1).min(length);
        atr_values.push(window_sum / samples as f64);
    }
    atr_values
}
