//! Supply and demand zones
//!
//! A zone is the base candle in front of an explosive move: the base's range
//! is below the trailing mean range and the next candle's range exceeds the
//! mean times `threshold_multiplier`. A bullish explosive candle leaves a
//! demand zone, a bearish one a supply zone. Zones revisited by any later bar
//! are dropped; the rest are merged when they overlap or sit close together.

use serde::{Deserialize, Serialize};

use super::helpers::{keep_most_recent, scan_mitigation};
use crate::{AnalysisError, OHLCVExt, Period, Result, Zone, ZoneKind, OHLCV};

/// Unmitigated zones, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyDemand {
    pub demand: Vec<Zone>,
    pub supply: Vec<Zone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneDetector {
    /// Trailing bars averaged for the mean range
    pub lookback: Period,
    pub threshold_multiplier: f64,
    /// Merge distance as a fraction of the lower zone's height
    pub tolerance_multiplier: f64,
    pub keep: Period,
}

impl Default for ZoneDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            threshold_multiplier: 1.5,
            tolerance_multiplier: 0.5,
            keep: Period::new_const(2),
        }
    }
}

impl ZoneDetector {
    pub fn validate_config(&self) -> Result<()> {
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "zone threshold multiplier must be positive, got {}",
                self.threshold_multiplier
            )));
        }
        if !self.tolerance_multiplier.is_finite() || self.tolerance_multiplier < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "zone merge tolerance must be non-negative, got {}",
                self.tolerance_multiplier
            )));
        }
        Ok(())
    }

    /// Scan every consecutive (base, explosive) pair. `mean_range` is the
    /// trailing mean range of the series; a non-positive value yields no zones.
    pub fn detect<T: OHLCV>(&self, bars: &[T], mean_range: f64) -> SupplyDemand {
        if !(mean_range.is_finite() && mean_range > 0.0) {
            return SupplyDemand::default();
        }
        let threshold = mean_range * self.threshold_multiplier;

        let mut demand = Vec::new();
        let mut supply = Vec::new();
        for (i, pair) in bars.windows(2).enumerate() {
            let (base, explosive) = (&pair[0], &pair[1]);
            if base.range() >= mean_range || explosive.range() <= threshold {
                continue;
            }
            let kind = if explosive.is_bullish() {
                ZoneKind::Demand
            } else if explosive.is_bearish() {
                ZoneKind::Supply
            } else {
                continue;
            };

            let mut zone = Zone::new(kind, base.high(), base.low(), base.time(), i);
            scan_mitigation(&mut zone, bars, i + 2);
            if zone.is_mitigated() {
                continue;
            }
            match kind {
                ZoneKind::Demand => demand.push(zone),
                _ => supply.push(zone),
            }
        }

        let recent = |zones: Vec<Zone>| {
            keep_most_recent(
                merge_zones(zones, self.tolerance_multiplier),
                self.keep.get(),
                |z| (z.time, z.index),
            )
        };
        SupplyDemand {
            demand: recent(demand),
            supply: recent(supply),
        }
    }
}

/// Merge zones sorted by low: a zone whose low is within
/// `high + height * tolerance_multiplier` of the previous merged zone is
/// folded into it. Merged zones take the union of bounds and the most recent
/// anchor. Output is sorted by low and merging it again changes nothing.
pub fn merge_zones(mut zones: Vec<Zone>, tolerance_multiplier: f64) -> Vec<Zone> {
    zones.sort_by(|a, b| a.low.total_cmp(&b.low).then(a.index.cmp(&b.index)));

    let mut merged: Vec<Zone> = Vec::with_capacity(zones.len());
    for zone in zones {
        match merged.last_mut() {
            Some(last) if zone.low <= last.high + last.height() * tolerance_multiplier => {
                last.absorb(&zone)
            }
            _ => merged.push(zone),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn level(i: i64, mid: f64) -> Candle {
        Candle::new(i, mid, mid + 0.5, mid - 0.5, mid + 0.1)
    }

    /// Ten bars at 100, a tight base, an explosive rally, then bars at 105
    fn rally_from_base() -> Vec<Candle> {
        let mut bars: Vec<Candle> = (0..10).map(|i| level(i, 100.0)).collect();
        bars.push(Candle::new(10, 100.0, 100.1, 99.9, 100.05));
        bars.push(Candle::new(11, 100.1, 104.1, 100.1, 104.0));
        bars.extend((12..20).map(|i| level(i, 105.0)));
        bars
    }

    fn mean(bars: &[Candle]) -> f64 {
        super::super::helpers::mean_range(bars, 50)
    }

    #[test]
    fn test_demand_zone_from_rally() {
        let bars = rally_from_base();
        let zones = ZoneDetector::default().detect(&bars, mean(&bars));

        assert!(zones.supply.is_empty());
        assert_eq!(zones.demand.len(), 1);
        let zone = zones.demand[0];
        assert_eq!(zone.kind, ZoneKind::Demand);
        assert_eq!(zone.high, 100.1);
        assert_eq!(zone.low, 99.9);
        assert_eq!(zone.time, 10);
        assert!(!zone.is_mitigated());
    }

    #[test]
    fn test_revisited_zone_is_dropped() {
        let mut bars = rally_from_base();
        bars.push(Candle::new(20, 105.0, 105.2, 100.0, 100.2));
        let zones = ZoneDetector::default().detect(&bars, mean(&bars));
        assert!(zones.demand.is_empty());
    }

    #[test]
    fn test_supply_zone_from_drop() {
        let mut bars: Vec<Candle> = (0..10).map(|i| level(i, 100.0)).collect();
        bars.push(Candle::new(10, 100.0, 100.1, 99.9, 99.95));
        bars.push(Candle::new(11, 99.9, 99.9, 95.9, 96.0));
        bars.extend((12..20).map(|i| level(i, 95.0)));

        let zones = ZoneDetector::default().detect(&bars, mean(&bars));
        assert!(zones.demand.is_empty());
        assert_eq!(zones.supply.len(), 1);
        assert_eq!(zones.supply[0].kind, ZoneKind::Supply);
    }

    #[test]
    fn test_zero_mean_range_yields_nothing() {
        let bars = rally_from_base();
        assert_eq!(ZoneDetector::default().detect(&bars, 0.0), SupplyDemand::default());
    }

    #[test]
    fn test_merge_overlapping() {
        let a = Zone::new(ZoneKind::Demand, 1.00, 1.10, 100, 1);
        let b = Zone::new(ZoneKind::Demand, 1.12, 1.20, 200, 2);
        let merged = merge_zones(vec![b, a], 0.5);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].low, 1.00);
        assert_eq!(merged[0].high, 1.20);
        assert_eq!(merged[0].time, 200);
    }

    #[test]
    fn test_merge_keeps_distant_zones() {
        let a = Zone::new(ZoneKind::Demand, 1.00, 1.10, 100, 1);
        let b = Zone::new(ZoneKind::Demand, 1.20, 1.30, 200, 2);
        let merged = merge_zones(vec![a, b], 0.5);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let zones = vec![
            Zone::new(ZoneKind::Supply, 1.00, 1.10, 1, 1),
            Zone::new(ZoneKind::Supply, 1.14, 1.16, 2, 2),
            Zone::new(ZoneKind::Supply, 1.40, 1.50, 3, 3),
            Zone::new(ZoneKind::Supply, 1.17, 1.19, 4, 4),
        ];
        let once = merge_zones(zones, 0.5);
        let twice = merge_zones(once.clone(), 0.5);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keep_two_most_recent() {
        let detector = ZoneDetector::default();
        // Three separate bases, each followed by a rally to a new level
        let mut bars = Vec::new();
        let mut t = 0;
        for base in [100.0, 110.0, 120.0] {
            for _ in 0..5 {
                bars.push(level(t, base));
                t += 1;
            }
            bars.push(Candle::new(t, base, base + 0.1, base - 0.1, base + 0.05));
            t += 1;
            bars.push(Candle::new(t, base + 0.1, base + 8.1, base + 0.1, base + 8.0));
            t += 1;
        }
        for _ in 0..5 {
            bars.push(level(t, 130.0));
            t += 1;
        }

        let zones = detector.detect(&bars, mean(&bars));
        assert_eq!(zones.demand.len(), 2);
        assert!(zones.demand[0].time < zones.demand[1].time);
        assert!((zones.demand[1].low - 119.9).abs() < 1e-9);
    }
}
