//! Swing pivot detection
//!
//! A bar is a swing high when its high is strictly greater than every other
//! high within `window` bars on either side; swing lows mirror this on lows.
//! The first and last `window` bars can never be pivots.

use serde::{Deserialize, Serialize};

use crate::{Period, Pivot, PivotKind, Result, OHLCV};

/// Symmetric-window swing detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotDetector {
    pub window: Period,
}

impl Default for PivotDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(5),
        }
    }
}

impl PivotDetector {
    pub fn min_bars(&self) -> usize {
        self.window.get().saturating_mul(2).saturating_add(1)
    }

    pub fn validate_config(&self) -> Result<()> {
        Period::new(self.window.get()).map(|_| ())
    }

    /// Pivots in chronological order. When one bar is both a swing low and
    /// a swing high, the low is emitted first.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<Pivot> {
        let w = self.window.get();
        let mut pivots = Vec::new();
        if bars.len() < self.min_bars() {
            return pivots;
        }

        for i in w..bars.len() - w {
            let bar = &bars[i];
            let neighbours = (i - w..=i + w).filter(|&j| j != i);

            let (low, high) = (bar.low(), bar.high());
            let is_low = neighbours.clone().all(|j| low < bars[j].low());
            let is_high = neighbours.into_iter().all(|j| high > bars[j].high());

            if is_low {
                pivots.push(Pivot {
                    kind: PivotKind::Low,
                    price: low,
                    index: i,
                    time: bar.time(),
                });
            }
            if is_high {
                pivots.push(Pivot {
                    kind: PivotKind::High,
                    price: high,
                    index: i,
                    time: bar.time(),
                });
            }
        }
        pivots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    /// Triangle wave: peaks every 20 bars at k=10, troughs at k=0
    fn triangle(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let k = i % 20;
                let mid = if k <= 10 { k as f64 } else { (20 - k) as f64 };
                Candle::new(i as i64, mid, mid + 0.5, mid - 0.5, mid)
            })
            .collect()
    }

    #[test]
    fn test_triangle_wave_pivots() {
        let pivots = PivotDetector::default().detect(&triangle(61));
        let found: Vec<(PivotKind, usize)> = pivots.iter().map(|p| (p.kind, p.index)).collect();
        assert_eq!(
            found,
            vec![
                (PivotKind::High, 10),
                (PivotKind::Low, 20),
                (PivotKind::High, 30),
                (PivotKind::Low, 40),
                (PivotKind::High, 50),
            ]
        );
        assert_eq!(pivots[0].price, 10.5);
        assert_eq!(pivots[1].price, -0.5);
        assert_eq!(pivots[0].time, 10);
    }

    #[test]
    fn test_too_few_bars() {
        let detector = PivotDetector::default();
        assert!(detector.detect(&triangle(10)).is_empty());
        assert!(detector.detect::<Candle>(&[]).is_empty());
    }

    #[test]
    fn test_equal_neighbour_is_not_pivot() {
        let bars: Vec<Candle> = [1.0, 2.0, 3.0, 3.0, 2.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &h)| Candle::new(i as i64, h - 0.5, h, h - 1.0, h - 0.5))
            .collect();
        let detector = PivotDetector {
            window: Period::new(1).unwrap(),
        };
        assert!(detector
            .detect(&bars)
            .iter()
            .all(|p| p.kind != PivotKind::High));
    }

    #[test]
    fn test_low_precedes_high_on_same_bar() {
        // Outside bar at index 1 is both the highest high and lowest low
        let bars = vec![
            Candle::new(0, 5.0, 6.0, 4.0, 5.0),
            Candle::new(1, 5.0, 9.0, 1.0, 5.0),
            Candle::new(2, 5.0, 6.0, 4.0, 5.0),
        ];
        let detector = PivotDetector {
            window: Period::new(1).unwrap(),
        };
        let kinds: Vec<PivotKind> = detector.detect(&bars).iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PivotKind::Low, PivotKind::High]);
    }

    #[test]
    fn test_oversized_window_from_config() {
        let detector: PivotDetector =
            serde_json::from_str(&format!(r#"{{"window": {}}}"#, usize::MAX)).unwrap();
        assert_eq!(detector.min_bars(), usize::MAX);
        assert!(detector.detect(&triangle(61)).is_empty());
    }
}
