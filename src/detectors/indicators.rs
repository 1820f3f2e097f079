//! Indicators: EMA, RSI, RSI divergence, EMA crosses and volume profile
//!
//! Series functions return one slot per input bar, `None` until enough
//! history exists, so values stay aligned with bar indices.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

use super::helpers::swings;
use crate::{AnalysisError, Period, Pivot, PivotKind, Result, OHLCV};

// ============================================================
// SERIES
// ============================================================

/// Exponential moving average seeded with the simple average of the first
/// `period` values. First defined value at index `period - 1`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for (i, &value) in values.iter().enumerate().skip(period) {
        prev = (value - prev) * multiplier + prev;
        out[i] = Some(prev);
    }
    out
}

/// Wilder-smoothed RSI. First defined value at index `period`.
///
/// A window with no losses reads 100, a window with no movement at all 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let p = period as f64;
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for w in values[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= p;
    avg_loss /= p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period + 1..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

// ============================================================
// SIGNALS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivergenceKind {
    /// Lower low in price, higher low in RSI
    Bullish,
    /// Higher high in price, lower high in RSI
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub kind: DivergenceKind,
    pub previous: Pivot,
    pub pivot: Pivot,
    pub previous_rsi: f64,
    pub rsi: f64,
}

/// Compare consecutive same-kind pivots against the RSI series.
/// Pivots where RSI is undefined are skipped.
pub fn rsi_divergences(pivots: &[Pivot], rsi: &[Option<f64>]) -> Vec<Divergence> {
    let rsi_at = |p: &Pivot| rsi.get(p.index).copied().flatten();
    let mut out = Vec::new();

    for kind in [PivotKind::High, PivotKind::Low] {
        for pair in swings(pivots, kind).windows(2) {
            let (previous, pivot) = (pair[0], pair[1]);
            let (Some(previous_rsi), Some(rsi)) = (rsi_at(&previous), rsi_at(&pivot)) else {
                continue;
            };
            let kind = match pivot.kind {
                PivotKind::High if pivot.price > previous.price && rsi < previous_rsi => {
                    DivergenceKind::Bearish
                }
                PivotKind::Low if pivot.price < previous.price && rsi > previous_rsi => {
                    DivergenceKind::Bullish
                }
                _ => continue,
            };
            out.push(Divergence {
                kind,
                previous,
                pivot,
                previous_rsi,
                rsi,
            });
        }
    }
    out.sort_by_key(|d| d.pivot.index);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossKind {
    /// Fast EMA crosses above the slow one
    GoldenCross,
    /// Fast EMA crosses below the slow one
    DeathCross,
}

impl CrossKind {
    pub fn label(self) -> &'static str {
        match self {
            CrossKind::GoldenCross => "Golden Cross",
            CrossKind::DeathCross => "Death Cross",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaCross {
    pub kind: CrossKind,
    pub index: usize,
    pub time: i64,
    /// Close of the crossing bar
    pub price: f64,
}

/// Sign changes of `fast - slow` where the later bar is one of the last
/// `lookback` bars.
pub fn ema_crosses<T: OHLCV>(
    bars: &[T],
    fast: &[Option<f64>],
    slow: &[Option<f64>],
    lookback: usize,
) -> Vec<EmaCross> {
    let n = bars.len().min(fast.len()).min(slow.len());
    let spread = |i: usize| -> Option<f64> { Some(fast[i]? - slow[i]?) };

    let mut out = Vec::new();
    for i in n.saturating_sub(lookback).max(1)..n {
        let (Some(prev), Some(curr)) = (spread(i - 1), spread(i)) else {
            continue;
        };
        let kind = if prev <= 0.0 && curr > 0.0 {
            CrossKind::GoldenCross
        } else if prev >= 0.0 && curr < 0.0 {
            CrossKind::DeathCross
        } else {
            continue;
        };
        out.push(EmaCross {
            kind,
            index: i,
            time: bars[i].time(),
            price: bars[i].close(),
        });
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBucket {
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

impl VolumeBucket {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub buckets: Vec<VolumeBucket>,
    /// Midpoint of the heaviest bucket (lowest one on ties)
    pub point_of_control: f64,
    /// Midpoints of buckets above the configured volume percentile
    pub high_volume_nodes: Vec<f64>,
}

/// Bucket closes into `bins` equal-width slots between the lowest and highest
/// close. Bars without volume count as 1, so the profile degrades to a close
/// histogram.
pub fn volume_profile<T: OHLCV>(bars: &[T], bins: usize, percentile: usize) -> Option<VolumeProfile> {
    if bars.is_empty() || bins == 0 {
        return None;
    }
    let (min, max) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.close()), hi.max(b.close()))
    });
    let width = (max - min) / bins as f64;

    let mut buckets: Vec<VolumeBucket> = (0..bins)
        .map(|k| VolumeBucket {
            low: min + width * k as f64,
            high: min + width * (k + 1) as f64,
            volume: 0.0,
        })
        .collect();
    for bar in bars {
        let slot = if width > 0.0 {
            (((bar.close() - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        buckets[slot].volume += bar.volume().unwrap_or(1.0);
    }

    let heaviest = buckets
        .iter()
        .reduce(|best, b| if b.volume > best.volume { b } else { best })?;
    let point_of_control = heaviest.midpoint();

    let mut volumes = Data::new(buckets.iter().map(|b| b.volume).collect::<Vec<f64>>());
    let threshold = volumes.percentile(percentile);
    let high_volume_nodes = buckets
        .iter()
        .filter(|b| b.volume > threshold)
        .map(VolumeBucket::midpoint)
        .collect();

    Some(VolumeProfile {
        buckets,
        point_of_control,
        high_volume_nodes,
    })
}

// ============================================================
// ENGINE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaValue {
    pub period: usize,
    /// Latest value; `None` when the series is shorter than the period
    pub value: Option<f64>,
}

/// Latest indicator readings plus recent signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub emas: Vec<EmaValue>,
    pub rsi: Option<f64>,
    pub divergences: Vec<Divergence>,
    pub crosses: Vec<EmaCross>,
    pub volume_profile: Option<VolumeProfile>,
}

impl IndicatorSnapshot {
    pub fn ema(&self, period: usize) -> Option<f64> {
        self.emas.iter().find(|e| e.period == period)?.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorEngine {
    pub ema_periods: Vec<Period>,
    pub rsi_period: Period,
    pub cross_fast: Period,
    pub cross_slow: Period,
    pub cross_lookback: Period,
    pub volume_bins: Period,
    /// Percentile (1..=100) a bucket must exceed to count as a high-volume node
    pub high_volume_percentile: Period,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            ema_periods: vec![
                Period::new_const(21),
                Period::new_const(50),
                Period::new_const(200),
            ],
            rsi_period: Period::new_const(14),
            cross_fast: Period::new_const(50),
            cross_slow: Period::new_const(200),
            cross_lookback: Period::new_const(5),
            volume_bins: Period::new_const(20),
            high_volume_percentile: Period::new_const(75),
        }
    }
}

impl IndicatorEngine {
    pub fn validate_config(&self) -> Result<()> {
        if self.cross_fast >= self.cross_slow {
            return Err(AnalysisError::InvalidConfig(format!(
                "fast EMA ({}) must be shorter than slow EMA ({})",
                self.cross_fast.get(),
                self.cross_slow.get()
            )));
        }
        if self.high_volume_percentile.get() > 100 {
            return Err(AnalysisError::OutOfRange {
                field: "high_volume_percentile",
                value: self.high_volume_percentile.get() as f64,
                min: 1.0,
                max: 100.0,
            });
        }
        Ok(())
    }

    pub fn compute<T: OHLCV>(&self, bars: &[T], pivots: &[Pivot]) -> IndicatorSnapshot {
        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();

        let emas = self
            .ema_periods
            .iter()
            .map(|p| EmaValue {
                period: p.get(),
                value: ema(&closes, p.get()).last().copied().flatten(),
            })
            .collect();

        let rsi_series = rsi(&closes, self.rsi_period.get());
        let fast = ema(&closes, self.cross_fast.get());
        let slow = ema(&closes, self.cross_slow.get());

        IndicatorSnapshot {
            emas,
            rsi: rsi_series.last().copied().flatten(),
            divergences: rsi_divergences(pivots, &rsi_series),
            crosses: ema_crosses(bars, &fast, &slow, self.cross_lookback.get()),
            volume_profile: volume_profile(
                bars,
                self.volume_bins.get(),
                self.high_volume_percentile.get(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn closes_to_bars(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64, c, c + 0.5, c - 0.5, c))
            .collect()
    }

    #[test]
    fn test_ema_seed_and_step() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = ema(&values, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        // multiplier 0.5: (4 - 2) * 0.5 + 2
        assert_eq!(out[3], Some(3.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn test_ema_short_series() {
        assert!(ema(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn test_rsi_first_value_index() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&values, 14);
        assert!(out[..14].iter().all(Option::is_none));
        assert_eq!(out[14], Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_fifty() {
        let out = rsi(&[5.0; 16], 14);
        assert_eq!(out[15], Some(50.0));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let out = rsi(&values, 14);
        assert_eq!(out[19], Some(0.0));
    }

    #[test]
    fn test_rsi_bounded() {
        let values: Vec<f64> = (0..100).map(|i| 50.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_bearish_divergence() {
        let pivots = vec![
            Pivot { kind: PivotKind::High, price: 1.10, index: 2, time: 2 },
            Pivot { kind: PivotKind::High, price: 1.12, index: 4, time: 4 },
        ];
        let rsi = vec![None, None, Some(70.0), None, Some(60.0)];
        let found = rsi_divergences(&pivots, &rsi);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DivergenceKind::Bearish);
        assert_eq!(found[0].pivot.index, 4);
    }

    #[test]
    fn test_bullish_divergence() {
        let pivots = vec![
            Pivot { kind: PivotKind::Low, price: 1.10, index: 1, time: 1 },
            Pivot { kind: PivotKind::Low, price: 1.08, index: 3, time: 3 },
        ];
        let rsi = vec![None, Some(25.0), None, Some(35.0)];
        let found = rsi_divergences(&pivots, &rsi);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DivergenceKind::Bullish);
    }

    #[test]
    fn test_divergence_skips_undefined_rsi() {
        let pivots = vec![
            Pivot { kind: PivotKind::High, price: 1.10, index: 0, time: 0 },
            Pivot { kind: PivotKind::High, price: 1.12, index: 2, time: 2 },
        ];
        let rsi = vec![None, None, Some(40.0)];
        assert!(rsi_divergences(&pivots, &rsi).is_empty());
    }

    #[test]
    fn test_golden_and_death_cross() {
        let bars = closes_to_bars(&[1.0; 6]);
        let fast = vec![Some(0.95), Some(0.9), Some(1.2), Some(1.3), Some(0.8), Some(0.7)];
        let slow = vec![Some(1.0); 6];

        let crosses = ema_crosses(&bars, &fast, &slow, 5);
        let kinds: Vec<(CrossKind, usize)> = crosses.iter().map(|c| (c.kind, c.index)).collect();
        assert_eq!(
            kinds,
            vec![(CrossKind::GoldenCross, 2), (CrossKind::DeathCross, 4)]
        );

        // Only the last two bars: just the pair (4, 5), no sign change
        assert!(ema_crosses(&bars, &fast, &slow, 1).is_empty());
    }

    #[test]
    fn test_volume_profile_poc() {
        let mut bars = closes_to_bars(&[10.0, 10.0, 10.0, 20.0]);
        bars[3] = bars[3].with_volume(1.0);
        for bar in bars.iter_mut().take(3) {
            *bar = bar.with_volume(5.0);
        }
        let profile = volume_profile(&bars, 4, 75).unwrap();
        assert_eq!(profile.buckets.len(), 4);
        assert_eq!(profile.buckets[0].volume, 15.0);
        assert_eq!(profile.buckets[3].volume, 1.0);
        assert!((profile.point_of_control - 11.25).abs() < 1e-9);
        assert_eq!(profile.high_volume_nodes.len(), 1);
        assert!((profile.high_volume_nodes[0] - 11.25).abs() < 1e-9);
    }

    #[test]
    fn test_volume_profile_flat_prices() {
        let bars = closes_to_bars(&[3.0; 5]);
        let profile = volume_profile(&bars, 20, 75).unwrap();
        assert_eq!(profile.buckets[0].volume, 5.0);
        assert_eq!(profile.point_of_control, 3.0);
    }

    #[test]
    fn test_volume_profile_empty() {
        assert!(volume_profile::<Candle>(&[], 20, 75).is_none());
    }

    #[test]
    fn test_compute_short_series() {
        let bars = closes_to_bars(&[1.0, 2.0, 3.0]);
        let snapshot = IndicatorEngine::default().compute(&bars, &[]);
        assert_eq!(snapshot.emas.len(), 3);
        assert!(snapshot.emas.iter().all(|e| e.value.is_none()));
        assert_eq!(snapshot.rsi, None);
        assert!(snapshot.crosses.is_empty());
        assert!(snapshot.volume_profile.is_some());
    }

    #[test]
    fn test_inverted_cross_periods_rejected() {
        let engine = IndicatorEngine {
            cross_fast: Period::new(200).unwrap(),
            cross_slow: Period::new(50).unwrap(),
            ..Default::default()
        };
        assert!(engine.validate_config().is_err());
    }
}
