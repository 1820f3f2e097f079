//! Order blocks
//!
//! A bearish order block needs a liquidity sweep (a swing high above the
//! previous swing high) followed by a break of structure (a later swing low
//! below the swing low that stood before the sweep). The block is the last
//! up-close candle of the leg into the sweep, taken strictly between the two
//! swing highs. Bullish blocks mirror this on swing lows with the last
//! down-close candle.

use serde::{Deserialize, Serialize};

use super::helpers::{dedup_by_bounds, fresh, keep_most_recent, swings};
use crate::{Direction, OHLCVExt, Period, Pivot, PivotKind, Result, Zone, ZoneKind, OHLCV};

/// Block zone with the swings that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub zone: Zone,
    /// Swing that took out the previous swing's liquidity
    pub sweep: Pivot,
    /// Opposite swing that broke the prior structure
    pub break_of_structure: Pivot,
}

/// Unmitigated order blocks, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBlocks {
    pub bullish: Vec<OrderBlock>,
    pub bearish: Vec<OrderBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBlockDetector {
    pub keep: Period,
}

impl Default for OrderBlockDetector {
    fn default() -> Self {
        Self {
            keep: Period::new_const(2),
        }
    }
}

impl OrderBlockDetector {
    pub fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T], pivots: &[Pivot]) -> OrderBlocks {
        let highs = swings(pivots, PivotKind::High);
        let lows = swings(pivots, PivotKind::Low);
        OrderBlocks {
            bullish: self.scan(bars, &lows, &highs, Direction::Bullish),
            bearish: self.scan(bars, &highs, &lows, Direction::Bearish),
        }
    }

    /// `sweeps` are the swings that take liquidity, `breaks` the opposite side.
    fn scan<T: OHLCV>(
        &self,
        bars: &[T],
        sweeps: &[Pivot],
        breaks: &[Pivot],
        direction: Direction,
    ) -> Vec<OrderBlock> {
        let bearish = direction.is_bearish();
        let mut blocks = Vec::new();

        for pair in sweeps.windows(2) {
            let (prior, sweep) = (pair[0], pair[1]);
            let swept = if bearish {
                sweep.price > prior.price
            } else {
                sweep.price < prior.price
            };
            if !swept {
                continue;
            }

            let Some(reference) = breaks.iter().rev().find(|p| p.index < sweep.index) else {
                continue;
            };
            let Some(bos) = breaks.iter().find(|p| {
                p.index > sweep.index
                    && if bearish {
                        p.price < reference.price
                    } else {
                        p.price > reference.price
                    }
            }) else {
                continue;
            };

            let opposing = |j: &usize| {
                let candle = &bars[*j];
                if bearish {
                    candle.is_bullish()
                } else {
                    candle.is_bearish()
                }
            };
            let Some(j) = (prior.index + 1..sweep.index).rev().find(opposing) else {
                continue;
            };

            let kind = if bearish {
                ZoneKind::BearishOrderBlock
            } else {
                ZoneKind::BullishOrderBlock
            };
            let candle = &bars[j];
            let zone = Zone::new(kind, candle.high(), candle.low(), candle.time(), j);
            if let Some(zone) = fresh(zone, bars, bos.index + 1) {
                blocks.push(OrderBlock {
                    zone,
                    sweep,
                    break_of_structure: *bos,
                });
            }
        }

        let blocks = dedup_by_bounds(blocks, |b| &b.zone);
        keep_most_recent(blocks, self.keep.get(), |b| (b.zone.time, b.zone.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::PivotDetector;
    use crate::Candle;

    fn c(i: i64, o: f64, h: f64, l: f64, close: f64) -> Candle {
        Candle::new(i, o, h, l, close)
    }

    /// Swing high at 1, swing low at 3, higher swing high at 5 (sweep),
    /// swing low at 7 below the one at 3 (break of structure).
    fn sweep_then_break() -> Vec<Candle> {
        vec![
            c(0, 10.0, 10.5, 9.5, 10.0),
            c(1, 10.0, 12.0, 10.0, 11.5),
            c(2, 11.5, 11.6, 10.5, 10.8),
            c(3, 10.8, 10.9, 10.0, 10.2),
            c(4, 10.3, 11.5, 10.2, 11.4),
            c(5, 11.4, 12.5, 11.2, 11.3),
            c(6, 11.3, 11.4, 9.8, 9.9),
            c(7, 9.9, 10.0, 9.0, 9.2),
            c(8, 9.2, 9.6, 9.1, 9.3),
            c(9, 9.3, 9.4, 9.2, 9.25),
        ]
    }

    fn pivots(bars: &[Candle]) -> Vec<Pivot> {
        PivotDetector {
            window: Period::new(1).unwrap(),
        }
        .detect(bars)
    }

    #[test]
    fn test_fixture_pivots() {
        assert!(crate::validate_series(&sweep_then_break()).is_ok());
        let found: Vec<(PivotKind, usize)> = pivots(&sweep_then_break())
            .iter()
            .map(|p| (p.kind, p.index))
            .collect();
        assert_eq!(
            found,
            vec![
                (PivotKind::High, 1),
                (PivotKind::Low, 3),
                (PivotKind::High, 5),
                (PivotKind::Low, 7),
            ]
        );
    }

    #[test]
    fn test_bearish_order_block() {
        let bars = sweep_then_break();
        let blocks = OrderBlockDetector::default().detect(&bars, &pivots(&bars));

        assert!(blocks.bullish.is_empty());
        assert_eq!(blocks.bearish.len(), 1);
        let block = blocks.bearish[0];
        assert_eq!(block.zone.kind, ZoneKind::BearishOrderBlock);
        assert_eq!(block.zone.index, 4);
        assert_eq!(block.zone.high, 11.5);
        assert_eq!(block.zone.low, 10.2);
        assert_eq!(block.sweep.index, 5);
        assert_eq!(block.break_of_structure.index, 7);
        assert!(block.break_of_structure.price < 10.0);
    }

    #[test]
    fn test_mitigated_block_is_dropped() {
        let mut bars = sweep_then_break();
        bars.push(c(10, 9.25, 10.4, 9.2, 10.3));
        let blocks = OrderBlockDetector::default().detect(&bars, &pivots(&bars));
        assert!(blocks.bearish.is_empty());
    }

    #[test]
    fn test_no_break_no_block() {
        let mut bars = sweep_then_break();
        // Lift the would-be break above the reference low
        bars[6] = c(6, 11.3, 11.4, 10.6, 10.7);
        bars[7] = c(7, 10.7, 10.8, 10.1, 10.2);
        bars[8] = c(8, 10.2, 10.6, 10.15, 10.3);
        bars[9] = c(9, 10.3, 10.4, 10.2, 10.25);
        let blocks = OrderBlockDetector::default().detect(&bars, &pivots(&bars));
        assert!(blocks.bearish.is_empty());
    }

    #[test]
    fn test_bullish_order_block() {
        // Mirror of the bearish fixture around 20.0
        let bars: Vec<Candle> = sweep_then_break()
            .iter()
            .map(|b| c(b.time, 20.0 - b.open, 20.0 - b.low, 20.0 - b.high, 20.0 - b.close))
            .collect();
        let blocks = OrderBlockDetector::default().detect(&bars, &pivots(&bars));

        assert!(blocks.bearish.is_empty());
        assert_eq!(blocks.bullish.len(), 1);
        let block = blocks.bullish[0];
        assert_eq!(block.zone.kind, ZoneKind::BullishOrderBlock);
        assert_eq!(block.zone.index, 4);
        assert_eq!(block.sweep.kind, PivotKind::Low);
        assert_eq!(block.break_of_structure.kind, PivotKind::High);
    }
}
