use crate::data::{Pivot, PivotMode};

/// Detect confirmed local extrema in a price sub-series.
///
/// Bar `i` is a pivot when its value ties the extreme of the window spanning
/// `left` bars before and `right` bars after it, so a flat top or bottom
/// yields a pivot at every bar of the plateau. The final `right` bars of the
/// series can never be confirmed and are excluded.
pub fn detect_pivots(values: &[f64], left: usize, right: usize, mode: PivotMode) -> Vec<Pivot> {
    assert!(left >= 1, "pivot left window must be at least 1");
    assert!(right >= 1, "pivot right window must be at least 1");

    let len = values.len();
    if len < left + right + 1 {
        return Vec::new();
    }

    let mut pivots = Vec::new();
    for idx in left..len - right {
        let window = &values[idx - left..=idx + right];
        // The center value never exceeds the window extreme, so reaching it
        // means tying it.
        let confirmed = match mode {
            PivotMode::High => {
                let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                values[idx] >= max
            }
            PivotMode::Low => {
                let min = window.iter().copied().fold(f64::INFINITY, f64::min);
                values[idx] <= min
            }
        };
        if confirmed {
            pivots.push(Pivot {
                index: idx,
                price: values[idx],
            });
        }
    }
    pivots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_yields_no_pivots() {
        let values = [1.0, 2.0, 1.0];
        assert!(detect_pivots(&values, 2, 2, PivotMode::High).is_empty());
    }

    #[test]
    fn detects_local_highs() {
        let values = [10.0, 12.0, 15.0, 12.0, 10.0, 9.0, 11.0, 14.0, 16.0, 13.0];
        let pivots = detect_pivots(&values, 1, 1, PivotMode::High);
        let found: Vec<(usize, f64)> = pivots.iter().map(|p| (p.index, p.price)).collect();
        assert_eq!(found, vec![(2, 15.0), (8, 16.0)]);
    }

    #[test]
    fn detects_local_lows() {
        let values = [10.0, 8.0, 5.0, 8.0, 10.0, 11.0, 9.0, 6.0, 4.0, 7.0];
        let pivots = detect_pivots(&values, 1, 1, PivotMode::Low);
        let found: Vec<(usize, f64)> = pivots.iter().map(|p| (p.index, p.price)).collect();
        assert_eq!(found, vec![(2, 5.0), (8, 4.0)]);
    }

    #[test]
    fn plateau_yields_a_pivot_per_bar() {
        let values = [1.0, 5.0, 5.0, 5.0, 1.0];
        let pivots = detect_pivots(&values, 1, 1, PivotMode::High);
        let indices: Vec<usize> = pivots.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn unconfirmed_trailing_extreme_is_excluded() {
        // The series keeps rising into its final bar, so the global maximum
        // sits inside the trailing window and is never confirmed.
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(detect_pivots(&values, 1, 1, PivotMode::High).is_empty());
    }

    #[test]
    fn leading_extreme_is_excluded() {
        // The global maximum sits at index 1, inside the leading window, so
        // it is never evaluated.
        let values = [5.0, 9.0, 3.0, 2.0, 1.0, 0.0];
        assert!(detect_pivots(&values, 2, 2, PivotMode::High).is_empty());
    }

    #[test]
    fn wider_window_prunes_minor_extremes() {
        let values = [10.0, 12.0, 11.0, 13.0, 11.0, 12.0, 10.0];
        let narrow = detect_pivots(&values, 1, 1, PivotMode::High);
        let wide = detect_pivots(&values, 2, 2, PivotMode::High);
        assert_eq!(narrow.len(), 3);
        let found: Vec<(usize, f64)> = wide.iter().map(|p| (p.index, p.price)).collect();
        assert_eq!(found, vec![(3, 13.0)]);
    }

    #[test]
    #[should_panic(expected = "left window")]
    fn zero_left_window_panics() {
        detect_pivots(&[1.0, 2.0, 1.0], 0, 1, PivotMode::High);
    }
}
