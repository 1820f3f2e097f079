//! Liquidity pools: clusters of near-equal swing highs or swing lows
//!
//! Buy-side liquidity rests above clustered swing highs, sell-side below
//! clustered swing lows. Pivots are sorted by price and grouped while each
//! stays within `tolerance_percent` of the group's first member; only groups
//! with more than one touch become pools.

use serde::{Deserialize, Serialize};

use super::helpers::swings;
use crate::{AnalysisError, Pivot, PivotKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolSide {
    BuySide,
    SellSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolTouch {
    pub price: f64,
    pub time: i64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub side: PoolSide,
    /// At least two touches, in the order they were clustered
    pub touches: Vec<PoolTouch>,
}

impl LiquidityPool {
    /// Price the pool was anchored at
    pub fn level(&self) -> f64 {
        self.touches.first().map_or(f64::NAN, |t| t.price)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPools {
    pub buy_side: Vec<LiquidityPool>,
    pub sell_side: Vec<LiquidityPool>,
}

impl LiquidityPools {
    pub fn is_empty(&self) -> bool {
        self.buy_side.is_empty() && self.sell_side.is_empty()
    }

    pub fn buy_side_touches(&self) -> impl Iterator<Item = &PoolTouch> {
        self.buy_side.iter().flat_map(|p| p.touches.iter())
    }

    pub fn sell_side_touches(&self) -> impl Iterator<Item = &PoolTouch> {
        self.sell_side.iter().flat_map(|p| p.touches.iter())
    }

    /// Every touch, buy side first
    pub fn touches(&self) -> impl Iterator<Item = &PoolTouch> {
        self.buy_side_touches().chain(self.sell_side_touches())
    }

    /// Closest buy-side touch strictly above `price`
    pub fn nearest_above(&self, price: f64) -> Option<f64> {
        self.buy_side_touches()
            .map(|t| t.price)
            .filter(|p| *p > price)
            .min_by(f64::total_cmp)
    }

    /// Closest sell-side touch strictly below `price`
    pub fn nearest_below(&self, price: f64) -> Option<f64> {
        self.sell_side_touches()
            .map(|t| t.price)
            .filter(|p| *p < price)
            .max_by(f64::total_cmp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityClusterer {
    /// Cluster width as a percentage of the anchor price
    pub tolerance_percent: f64,
}

impl Default for LiquidityClusterer {
    fn default() -> Self {
        Self {
            tolerance_percent: 0.1,
        }
    }
}

impl LiquidityClusterer {
    pub fn validate_config(&self) -> Result<()> {
        if !self.tolerance_percent.is_finite() || self.tolerance_percent < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "liquidity tolerance must be non-negative, got {}",
                self.tolerance_percent
            )));
        }
        Ok(())
    }

    pub fn detect(&self, pivots: &[Pivot]) -> LiquidityPools {
        let mut highs = swings(pivots, PivotKind::High);
        highs.sort_by(|a, b| b.price.total_cmp(&a.price).then(a.index.cmp(&b.index)));
        let mut lows = swings(pivots, PivotKind::Low);
        lows.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.index.cmp(&b.index)));

        LiquidityPools {
            buy_side: self.cluster(&highs, PoolSide::BuySide),
            sell_side: self.cluster(&lows, PoolSide::SellSide),
        }
    }

    fn cluster(&self, sorted: &[Pivot], side: PoolSide) -> Vec<LiquidityPool> {
        let mut pools = Vec::new();
        let mut group: Vec<PoolTouch> = Vec::new();

        for pivot in sorted {
            if let Some(anchor) = group.first() {
                let tolerance = anchor.price.abs() * self.tolerance_percent / 100.0;
                if (pivot.price - anchor.price).abs() > tolerance {
                    flush(&mut pools, &mut group, side);
                }
            }
            group.push(PoolTouch {
                price: pivot.price,
                time: pivot.time,
                index: pivot.index,
            });
        }
        flush(&mut pools, &mut group, side);
        pools
    }
}

fn flush(pools: &mut Vec<LiquidityPool>, group: &mut Vec<PoolTouch>, side: PoolSide) {
    if group.len() > 1 {
        pools.push(LiquidityPool {
            side,
            touches: std::mem::take(group),
        });
    } else {
        group.clear();
    }
}
