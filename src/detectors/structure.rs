//! Market structure classification and support/resistance levels

use serde::{Deserialize, Serialize};

use super::helpers::swings;
use crate::{AnalysisError, Period, Pivot, PivotKind, Result, Trend};

/// Trend label plus a sentence explaining it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStructure {
    pub trend: Trend,
    pub explanation: String,
}

impl Default for MarketStructure {
    fn default() -> Self {
        Self {
            trend: Trend::Ranging,
            explanation: "Market structure was not evaluated.".to_string(),
        }
    }
}

/// Classifies trend from the most recent pivots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureClassifier {
    /// Swing highs and swing lows considered per side, counted back from the most recent
    pub lookback: Period,
    /// Support and resistance levels reported per side
    pub max_levels: Period,
}

impl Default for StructureClassifier {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(10),
            max_levels: Period::new_const(3),
        }
    }
}

impl StructureClassifier {
    pub fn validate_config(&self) -> Result<()> {
        if self.lookback.get() < 2 {
            return Err(AnalysisError::InvalidConfig(
                "structure lookback must cover at least 2 swings per side".into(),
            ));
        }
        Ok(())
    }

    /// Uptrend needs a higher high and a higher low; downtrend a lower high
    /// and a lower low. Anything else, including fewer than two swings on
    /// either side, is ranging.
    ///
    /// The lookback window is taken per side, so a run of one swing kind
    /// never pushes the other out of view.
    pub fn classify(&self, pivots: &[Pivot]) -> MarketStructure {
        let lookback = self.lookback.get();
        let recent = |kind: PivotKind| {
            let all = swings(pivots, kind);
            all[all.len().saturating_sub(lookback)..].to_vec()
        };
        let highs = recent(PivotKind::High);
        let lows = recent(PivotKind::Low);

        if highs.len() < 2 || lows.len() < 2 {
            return MarketStructure {
                trend: Trend::Ranging,
                explanation: "Too few swing points to establish a trend.".to_string(),
            };
        }

        let (prev_high, last_high) = (highs[highs.len() - 2].price, highs[highs.len() - 1].price);
        let (prev_low, last_low) = (lows[lows.len() - 2].price, lows[lows.len() - 1].price);

        if last_high > prev_high && last_low > prev_low {
            MarketStructure {
                trend: Trend::Uptrend,
                explanation: format!(
                    "Uptrend: higher high ({last_high:.5} > {prev_high:.5}) and higher low ({last_low:.5} > {prev_low:.5})."
                ),
            }
        } else if last_high < prev_high && last_low < prev_low {
            MarketStructure {
                trend: Trend::Downtrend,
                explanation: format!(
                    "Downtrend: lower high ({last_high:.5} < {prev_high:.5}) and lower low ({last_low:.5} < {prev_low:.5})."
                ),
            }
        } else {
            MarketStructure {
                trend: Trend::Ranging,
                explanation: "Ranging: recent swings show no consistent directional bias.".to_string(),
            }
        }
    }

    /// Support from swing lows and resistance from swing highs, each the
    /// highest `max_levels` distinct prices in descending order.
    pub fn levels(&self, pivots: &[Pivot]) -> (Vec<f64>, Vec<f64>) {
        let pick = |kind: PivotKind| {
            let mut prices: Vec<f64> = swings(pivots, kind).iter().map(|p| p.price).collect();
            prices.sort_by(|a, b| b.total_cmp(a));
            prices.dedup();
            prices.truncate(self.max_levels.get());
            prices
        };
        (pick(PivotKind::Low), pick(PivotKind::High))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot(kind: PivotKind, price: f64, index: usize) -> Pivot {
        Pivot {
            kind,
            price,
            index,
            time: index as i64,
        }
    }

    #[test]
    fn test_uptrend() {
        let pivots = vec![
            pivot(PivotKind::High, 1.1050, 5),
            pivot(PivotKind::Low, 1.1000, 10),
            pivot(PivotKind::High, 1.1100, 15),
            pivot(PivotKind::Low, 1.1020, 20),
        ];
        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Uptrend);
        assert!(s.explanation.contains("1.11000"));
        assert!(s.explanation.contains("1.10500"));
    }

    #[test]
    fn test_downtrend() {
        let pivots = vec![
            pivot(PivotKind::High, 1.20, 5),
            pivot(PivotKind::Low, 1.15, 10),
            pivot(PivotKind::High, 1.18, 15),
            pivot(PivotKind::Low, 1.12, 20),
        ];
        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Downtrend);
    }

    #[test]
    fn test_mixed_is_ranging() {
        let pivots = vec![
            pivot(PivotKind::High, 1.20, 5),
            pivot(PivotKind::Low, 1.10, 10),
            pivot(PivotKind::High, 1.22, 15),
            pivot(PivotKind::Low, 1.08, 20),
        ];
        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Ranging);
        assert!(s.explanation.starts_with("Ranging"));
    }

    #[test]
    fn test_too_few_pivots() {
        let pivots = vec![pivot(PivotKind::High, 1.2, 5), pivot(PivotKind::Low, 1.1, 9)];
        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Ranging);
        assert!(s.explanation.contains("Too few"));
    }

    #[test]
    fn test_lookback_counts_each_side() {
        let pivots = vec![
            pivot(PivotKind::High, 1.0, 0),
            pivot(PivotKind::Low, 0.5, 1),
            pivot(PivotKind::High, 2.0, 2),
            pivot(PivotKind::Low, 1.0, 3),
            pivot(PivotKind::High, 3.0, 4),
        ];
        let short = StructureClassifier {
            lookback: Period::new(2).unwrap(),
            ..Default::default()
        };
        // Last two highs (2.0, 3.0) and last two lows (0.5, 1.0)
        assert_eq!(short.classify(&pivots).trend, Trend::Uptrend);
        assert_eq!(
            StructureClassifier::default().classify(&pivots).trend,
            Trend::Uptrend
        );
    }

    #[test]
    fn test_run_of_highs_keeps_older_lows() {
        let mut pivots = vec![pivot(PivotKind::Low, 1.0, 0), pivot(PivotKind::Low, 1.1, 1)];
        pivots.extend((0..9).map(|k| pivot(PivotKind::High, 2.0 + k as f64 * 0.1, k + 2)));

        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Uptrend);
        assert!(s.explanation.contains("higher low (1.10000 > 1.00000)"));
    }

    #[test]
    fn test_run_of_lows_keeps_older_highs() {
        let mut pivots = vec![pivot(PivotKind::High, 5.0, 0), pivot(PivotKind::High, 4.8, 1)];
        pivots.extend((0..12).map(|k| pivot(PivotKind::Low, 3.0 - k as f64 * 0.1, k + 2)));

        let s = StructureClassifier::default().classify(&pivots);
        assert_eq!(s.trend, Trend::Downtrend);
    }

    #[test]
    fn test_levels_are_top_distinct_descending() {
        let pivots = vec![
            pivot(PivotKind::Low, 1.0, 1),
            pivot(PivotKind::Low, 3.0, 2),
            pivot(PivotKind::Low, 3.0, 3),
            pivot(PivotKind::Low, 2.0, 4),
            pivot(PivotKind::Low, 0.5, 5),
            pivot(PivotKind::High, 9.0, 6),
        ];
        let (support, resistance) = StructureClassifier::default().levels(&pivots);
        assert_eq!(support, vec![3.0, 2.0, 1.0]);
        assert_eq!(resistance, vec![9.0]);
    }

    #[test]
    fn test_rejects_single_pivot_lookback() {
        let classifier = StructureClassifier {
            lookback: Period::new(1).unwrap(),
            ..Default::default()
        };
        assert!(classifier.validate_config().is_err());
    }
}
