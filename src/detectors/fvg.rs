//! Fair-value gaps (three-candle imbalances)

use serde::{Deserialize, Serialize};

use super::helpers::{fresh, keep_most_recent};
use crate::{AnalysisError, Period, Result, Zone, ZoneKind, OHLCV};

/// Unmitigated gaps, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FairValueGaps {
    pub bullish: Vec<Zone>,
    pub bearish: Vec<Zone>,
}

/// A bullish gap exists when candle 1's high is below candle 3's low, a
/// bearish gap when candle 1's low is above candle 3's high. The gap is
/// stamped with the middle candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvgDetector {
    pub keep: Period,
    /// Minimum gap height in mean ranges. 0 keeps every gap.
    pub min_size_factor: f64,
}

impl Default for FvgDetector {
    fn default() -> Self {
        Self {
            keep: Period::new_const(2),
            min_size_factor: 0.0,
        }
    }
}

impl FvgDetector {
    pub fn validate_config(&self) -> Result<()> {
        if !self.min_size_factor.is_finite() || self.min_size_factor < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "gap size factor must be non-negative, got {}",
                self.min_size_factor
            )));
        }
        Ok(())
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T], mean_range: f64) -> FairValueGaps {
        let min_size = if mean_range.is_finite() {
            (mean_range * self.min_size_factor).max(0.0)
        } else {
            0.0
        };

        let mut bullish = Vec::new();
        let mut bearish = Vec::new();
        for i in 2..bars.len() {
            let (first, middle, third) = (&bars[i - 2], &bars[i - 1], &bars[i]);

            if first.high() < third.low() {
                let gap = Zone::new(
                    ZoneKind::BullishFvg,
                    third.low(),
                    first.high(),
                    middle.time(),
                    i - 1,
                );
                if gap.height() >= min_size {
                    bullish.extend(fresh(gap, bars, i + 1));
                }
            }
            if first.low() > third.high() {
                let gap = Zone::new(
                    ZoneKind::BearishFvg,
                    first.low(),
                    third.high(),
                    middle.time(),
                    i - 1,
                );
                if gap.height() >= min_size {
                    bearish.extend(fresh(gap, bars, i + 1));
                }
            }
        }

        let key = |z: &Zone| (z.time, z.index);
        FairValueGaps {
            bullish: keep_most_recent(bullish, self.keep.get(), key),
            bearish: keep_most_recent(bearish, self.keep.get(), key),
        }
    }
}
