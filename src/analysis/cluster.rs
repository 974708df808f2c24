use crate::data::{CandidateLevel, Pivot, Side};

/// Merge the most recent run of pivots into a single candidate level.
///
/// Pivots must arrive in ascending index order, as the detector emits them.
/// They are walked newest to oldest. The newest pivot seeds the level;
/// each older pivot is absorbed while its price stays within `tolerance` of
/// the running level price and its index within `max_gap_bars` of the last
/// absorbed pivot. The walk stops at the first pivot that violates either
/// bound, so the cluster is always a contiguous recent run rather than a
/// revival of a stale level. The level price walks toward the most extreme
/// absorbed touch: upward for resistance, downward for support.
pub fn cluster_last_level(
    pivots: &[Pivot],
    tolerance: f64,
    max_gap_bars: usize,
    side: Side,
) -> Option<CandidateLevel> {
    assert!(max_gap_bars >= 1, "max gap must be at least 1 bar");

    let newest = pivots.last()?;
    let mut level = CandidateLevel {
        price: newest.price,
        touches: 1,
        last_touch_bar: newest.index,
    };
    let mut frontier = newest.index;
    for pivot in pivots.iter().rev().skip(1) {
        let within_tolerance = (pivot.price - level.price).abs() <= tolerance;
        let within_gap = frontier - pivot.index <= max_gap_bars;
        if !within_tolerance || !within_gap {
            break;
        }
        level.touches += 1;
        frontier = pivot.index;
        level.price = match side {
            Side::Resistance => level.price.max(pivot.price),
            Side::Support => level.price.min(pivot.price),
        };
    }
    Some(level)
}
