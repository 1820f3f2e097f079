//! Common helpers shared by the zone, order-block and gap detectors

use crate::{OHLCVExt, Pivot, PivotKind, Zone, OHLCV};

/// Mean high-low range of the trailing `lookback` bars. 0.0 for an empty slice.
pub fn mean_range<T: OHLCV>(bars: &[T], lookback: usize) -> f64 {
    let start = bars.len().saturating_sub(lookback);
    let tail = &bars[start..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().map(|b| b.range()).sum::<f64>() / tail.len() as f64
}

/// Mark `zone` mitigated if any bar from `from` onward revisits it.
pub fn scan_mitigation<T: OHLCV>(zone: &mut Zone, bars: &[T], from: usize) {
    if bars.iter().skip(from).any(|bar| zone.is_revisited_by(bar)) {
        zone.mark_mitigated();
    }
}

/// The zone if no bar from `from` onward revisits it.
#[inline]
pub fn fresh<T: OHLCV>(mut zone: Zone, bars: &[T], from: usize) -> Option<Zone> {
    scan_mitigation(&mut zone, bars, from);
    (!zone.is_mitigated()).then_some(zone)
}

/// Keep the `n` most recent items by `key`, returned oldest first.
pub fn keep_most_recent<Z, K: Ord>(mut items: Vec<Z>, n: usize, key: impl Fn(&Z) -> K) -> Vec<Z> {
    items.sort_by_key(|item| key(item));
    let excess = items.len().saturating_sub(n);
    items.drain(..excess);
    items
}

/// Drop items whose zone repeats the bounds of an earlier one.
pub fn dedup_by_bounds<Z>(items: Vec<Z>, zone: impl Fn(&Z) -> &Zone) -> Vec<Z> {
    let mut kept: Vec<Z> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|k| zone(k).same_bounds(zone(&item))) {
            kept.push(item);
        }
    }
    kept
}

/// Pivots of one kind, in chronological order.
pub fn swings(pivots: &[Pivot], kind: PivotKind) -> Vec<Pivot> {
    pivots.iter().filter(|p| p.kind == kind).copied().collect()
}

/// Direction of the closes over the `lookback` bars that precede `index`.
///
/// Compares `close[index - 1]` to `close[index - 1 - lookback]`. `None` when
/// there is not enough history or the closes are equal.
pub fn prior_trend<T: OHLCV>(bars: &[T], index: usize, lookback: usize) -> Option<crate::Direction> {
    if index <= lookback || index > bars.len() {
        return None;
    }
    let last = bars[index - 1].close();
    let first = bars[index - 1 - lookback].close();
    if last > first {
        Some(crate::Direction::Bullish)
    } else if last < first {
        Some(crate::Direction::Bearish)
    } else {
        None
    }
}
