//! Trade suggestion from trend and zone context
//!
//! In an uptrend the first bullish zone containing the current price, with
//! room for a stop below the entry, gives a buy: demand zones are checked
//! first, then bullish order blocks, then bullish gaps. Downtrends mirror this with bearish zones. A ranging market
//! sells at supply and buys at demand. Stops sit just beyond the zone and the
//! target is the nearest liquidity pool past the entry, or a multiple of the
//! risk when there is none.

use serde::{Deserialize, Serialize};

use crate::detectors::{LiquidityPools, OrderBlock};
use crate::{AnalysisError, Direction, Ratio, Result, Trend, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Neutral,
}

impl Action {
    pub fn direction(self) -> Direction {
        match self {
            Action::Buy => Direction::Bullish,
            Action::Sell => Direction::Bearish,
            Action::Neutral => Direction::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Entry, stop and target. For a buy `stop_loss < entry`, for a sell `stop_loss > entry`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl TradeLevels {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.take_profit - self.entry).abs()
    }

    /// Reward over risk; `None` for zero risk
    pub fn reward_ratio(&self) -> Option<f64> {
        let risk = self.risk();
        (risk > 0.0).then(|| self.reward() / risk)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: Action,
    /// Present exactly when the action is not neutral
    pub levels: Option<TradeLevels>,
    /// Zone the entry was taken from
    pub source: Option<ZoneKind>,
    pub reason: String,
}

impl Suggestion {
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Neutral,
            levels: None,
            source: None,
            reason: reason.into(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.action == Action::Neutral
    }

    pub fn entry(&self) -> Option<f64> {
        self.levels.map(|l| l.entry)
    }
}

impl Default for Suggestion {
    fn default() -> Self {
        Self::neutral("No trade setup was evaluated.")
    }
}

/// Borrowed view of the zones a suggestion can be taken from
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneSet<'a> {
    pub demand: &'a [Zone],
    pub supply: &'a [Zone],
    pub bullish_order_blocks: &'a [OrderBlock],
    pub bearish_order_blocks: &'a [OrderBlock],
    pub bullish_fvgs: &'a [Zone],
    pub bearish_fvgs: &'a [Zone],
}

impl<'a> ZoneSet<'a> {
    /// Bullish zones in priority order
    pub fn bullish(&self) -> impl Iterator<Item = &'a Zone> {
        let ZoneSet {
            demand,
            bullish_order_blocks,
            bullish_fvgs,
            ..
        } = *self;
        demand
            .iter()
            .chain(bullish_order_blocks.iter().map(|b| &b.zone))
            .chain(bullish_fvgs.iter())
    }

    /// Bearish zones in priority order
    pub fn bearish(&self) -> impl Iterator<Item = &'a Zone> {
        let ZoneSet {
            supply,
            bearish_order_blocks,
            bearish_fvgs,
            ..
        } = *self;
        supply
            .iter()
            .chain(bearish_order_blocks.iter().map(|b| &b.zone))
            .chain(bearish_fvgs.iter())
    }
}

/// Neutral suggestion explaining why none of `zones` produced a setup
fn no_setup<'a>(mut zones: impl Iterator<Item = &'a Zone>, price: f64, outside: &str) -> Suggestion {
    match zones.find(|z| z.contains(price)) {
        Some(zone) => Suggestion::neutral(format!(
            "Price is inside a {}, but it leaves no room for a stop beyond entry.",
            zone.kind.label()
        )),
        None => Suggestion::neutral(outside),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionEngine {
    /// Stop distance beyond the zone edge, as a fraction of that edge
    pub stop_buffer: Ratio,
    /// Target as a multiple of risk when no liquidity pool lies beyond entry
    pub risk_reward: f64,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self {
            stop_buffer: Ratio::new_const(0.001),
            risk_reward: 2.0,
        }
    }
}

impl SuggestionEngine {
    pub fn validate_config(&self) -> Result<()> {
        if !self.risk_reward.is_finite() || self.risk_reward <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "risk/reward multiple must be positive, got {}",
                self.risk_reward
            )));
        }
        Ok(())
    }

    pub fn suggest(
        &self,
        price: f64,
        trend: Trend,
        zones: &ZoneSet<'_>,
        pools: &LiquidityPools,
    ) -> Suggestion {
        if !(price.is_finite() && price > 0.0) {
            return Suggestion::neutral("Current price is not a positive number; no setup evaluated.");
        }

        match trend {
            Trend::Uptrend => self
                .first_setup(Action::Buy, zones.bullish(), price, pools, "Uptrend")
                .unwrap_or_else(|| {
                    no_setup(
                        zones.bullish(),
                        price,
                        "Uptrend, but price is not inside a demand zone, bullish order block or bullish FVG.",
                    )
                }),
            Trend::Downtrend => self
                .first_setup(Action::Sell, zones.bearish(), price, pools, "Downtrend")
                .unwrap_or_else(|| {
                    no_setup(
                        zones.bearish(),
                        price,
                        "Downtrend, but price is not inside a supply zone, bearish order block or bearish FVG.",
                    )
                }),
            Trend::Ranging => self
                .first_setup(Action::Sell, zones.supply.iter(), price, pools, "Ranging market")
                .or_else(|| {
                    self.first_setup(Action::Buy, zones.demand.iter(), price, pools, "Ranging market")
                })
                .unwrap_or_else(|| {
                    no_setup(
                        zones.supply.iter().chain(zones.demand.iter()),
                        price,
                        "Ranging market and price is not at a supply or demand zone at the range edge.",
                    )
                }),
        }
    }

    /// First zone containing `price`, in order, that yields a stop on the
    /// far side of the entry.
    fn first_setup<'a>(
        &self,
        action: Action,
        zones: impl Iterator<Item = &'a Zone>,
        price: f64,
        pools: &LiquidityPools,
        context: &str,
    ) -> Option<Suggestion> {
        zones
            .filter(|z| z.contains(price))
            .find_map(|zone| self.setup(action, price, zone, pools, context))
    }

    /// Levels for trading `action` off `zone`; `None` when the stop would not
    /// sit beyond the entry.
    fn setup(
        &self,
        action: Action,
        price: f64,
        zone: &Zone,
        pools: &LiquidityPools,
        context: &str,
    ) -> Option<Suggestion> {
        let buffer = self.stop_buffer.get();
        let (stop_loss, take_profit) = match action {
            Action::Buy => {
                let stop_loss = zone.low * (1.0 - buffer);
                let risk = price - stop_loss;
                if risk <= 0.0 {
                    return None;
                }
                let target = pools
                    .nearest_above(price)
                    .unwrap_or(price + risk * self.risk_reward);
                (stop_loss, target)
            }
            Action::Sell => {
                let stop_loss = zone.high * (1.0 + buffer);
                let risk = stop_loss - price;
                if risk <= 0.0 {
                    return None;
                }
                let target = pools
                    .nearest_below(price)
                    .unwrap_or(price - risk * self.risk_reward);
                (stop_loss, target)
            }
            Action::Neutral => return None,
        };

        Some(Suggestion {
            action,
            levels: Some(TradeLevels {
                entry: price,
                stop_loss,
                take_profit,
            }),
            source: Some(zone.kind),
            reason: format!("{context}, price retesting a {}.", zone.kind.label()),
        })
    }
}
