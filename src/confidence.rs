//! Confidence scoring for trade suggestions
//!
//! A directional suggestion starts at `base_score` and gains `increment` for
//! each confluence factor lining up with its entry, capped at `cap`. Neutral
//! suggestions always score `neutral_score`.

use serde::{Deserialize, Serialize};

use crate::detectors::{OrderBlock, PatternMatch};
use crate::suggestion::{Action, Suggestion};
use crate::{AnalysisError, Direction, Ratio, Result, Zone};

/// Evidence a suggestion can be checked against
#[derive(Debug, Clone, Copy, Default)]
pub struct Confluence<'a> {
    pub bullish_order_blocks: &'a [OrderBlock],
    pub bearish_order_blocks: &'a [OrderBlock],
    pub bullish_fvgs: &'a [Zone],
    pub bearish_fvgs: &'a [Zone],
    pub support: &'a [f64],
    pub resistance: &'a [f64],
    pub patterns: &'a [PatternMatch],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfluenceFactor {
    /// Entry inside an order block of the trade's direction
    OrderBlock,
    /// Entry inside a fair-value gap of the trade's direction
    FairValueGap,
    /// Entry close to a support (buy) or resistance (sell) level
    KeyLevel,
    /// Candlestick pattern of the trade's direction among recent patterns
    Pattern,
}

impl ConfluenceFactor {
    pub fn label(self) -> &'static str {
        match self {
            ConfluenceFactor::OrderBlock => "order block",
            ConfluenceFactor::FairValueGap => "fair-value gap",
            ConfluenceFactor::KeyLevel => "key level",
            ConfluenceFactor::Pattern => "candlestick pattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceScorer {
    pub neutral_score: u8,
    pub base_score: u8,
    pub increment: u8,
    pub cap: u8,
    /// Relative distance from entry within which a level counts
    pub level_proximity: Ratio,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self {
            neutral_score: 30,
            base_score: 50,
            increment: 15,
            cap: 95,
            level_proximity: Ratio::new_const(0.001),
        }
    }
}

impl ConfidenceScorer {
    pub fn validate_config(&self) -> Result<()> {
        if self.cap > 100 || self.neutral_score > 100 {
            return Err(AnalysisError::InvalidConfig(format!(
                "confidence scores must not exceed 100 (cap {}, neutral {})",
                self.cap, self.neutral_score
            )));
        }
        if self.base_score > self.cap {
            return Err(AnalysisError::InvalidConfig(format!(
                "base confidence {} exceeds cap {}",
                self.base_score, self.cap
            )));
        }
        Ok(())
    }

    /// Factors that agree with the suggestion's direction and entry
    pub fn factors(&self, suggestion: &Suggestion, evidence: &Confluence<'_>) -> Vec<ConfluenceFactor> {
        let Some(entry) = suggestion.entry() else {
            return Vec::new();
        };
        let (blocks, gaps, levels, direction) = match suggestion.action {
            Action::Buy => (
                evidence.bullish_order_blocks,
                evidence.bullish_fvgs,
                evidence.support,
                Direction::Bullish,
            ),
            Action::Sell => (
                evidence.bearish_order_blocks,
                evidence.bearish_fvgs,
                evidence.resistance,
                Direction::Bearish,
            ),
            Action::Neutral => return Vec::new(),
        };

        let mut found = Vec::new();
        if blocks.iter().any(|b| b.zone.contains(entry)) {
            found.push(ConfluenceFactor::OrderBlock);
        }
        if gaps.iter().any(|g| g.contains(entry)) {
            found.push(ConfluenceFactor::FairValueGap);
        }
        let proximity = self.level_proximity.get();
        if levels
            .iter()
            .any(|level| (entry - level).abs() / entry <= proximity)
        {
            found.push(ConfluenceFactor::KeyLevel);
        }
        if evidence.patterns.iter().any(|p| p.kind.direction() == direction) {
            found.push(ConfluenceFactor::Pattern);
        }
        found
    }

    /// Score in 0..=100
    pub fn score(&self, suggestion: &Suggestion, evidence: &Confluence<'_>) -> u8 {
        if suggestion.is_neutral() {
            return self.neutral_score.min(100);
        }
        let count = self.factors(suggestion, evidence).len() as u32;
        let raw = u32::from(self.base_score) + u32::from(self.increment) * count;
        raw.min(u32::from(self.cap)).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::PatternKind;
    use crate::suggestion::TradeLevels;
    use crate::{Pivot, PivotKind, ZoneKind};

    fn buy_at(entry: f64) -> Suggestion {
        Suggestion {
            action: Action::Buy,
            levels: Some(TradeLevels {
                entry,
                stop_loss: entry * 0.99,
                take_profit: entry * 1.02,
            }),
            source: Some(ZoneKind::Demand),
            reason: "test".into(),
        }
    }

    fn block(low: f64, high: f64) -> OrderBlock {
        let pivot = Pivot {
            kind: PivotKind::Low,
            price: low,
            index: 0,
            time: 0,
        };
        OrderBlock {
            zone: Zone::new(ZoneKind::BullishOrderBlock, low, high, 0, 0),
            sweep: pivot,
            break_of_structure: pivot,
        }
    }

    fn sell_at(entry: f64) -> Suggestion {
        Suggestion {
            action: Action::Sell,
            levels: Some(TradeLevels {
                entry,
                stop_loss: entry * 1.01,
                take_profit: entry * 0.98,
            }),
            source: Some(ZoneKind::Supply),
            reason: "test".into(),
        }
    }

    fn pattern(kind: PatternKind) -> PatternMatch {
        let bar = crate::Candle::new(3, 1.0, 1.1, 0.9, 1.05);
        PatternMatch::new(kind, 3, &bar)
    }

    #[test]
    fn test_neutral_scores_baseline() {
        let scorer = ConfidenceScorer::default();
        let s = Suggestion::neutral("nothing");
        let blocks = vec![block(1.0, 2.0)];
        let evidence = Confluence {
            bullish_order_blocks: &blocks,
            ..Default::default()
        };
        assert_eq!(scorer.score(&s, &evidence), 30);
    }

    #[test]
    fn test_bare_buy_scores_base() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.score(&buy_at(1.5), &Confluence::default()), 50);
    }

    #[test]
    fn test_order_block_and_gap() {
        let scorer = ConfidenceScorer::default();
        let blocks = vec![block(1.40, 1.60)];
        let gaps = vec![Zone::new(ZoneKind::BullishFvg, 1.45, 1.55, 0, 0)];
        let evidence = Confluence {
            bullish_order_blocks: &blocks,
            bullish_fvgs: &gaps,
            ..Default::default()
        };
        let factors = scorer.factors(&buy_at(1.5), &evidence);
        assert_eq!(
            factors,
            vec![ConfluenceFactor::OrderBlock, ConfluenceFactor::FairValueGap]
        );
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 80);
    }

    #[test]
    fn test_bearish_evidence_does_not_count_for_buy() {
        let scorer = ConfidenceScorer::default();
        let gaps = vec![Zone::new(ZoneKind::BearishFvg, 1.45, 1.55, 0, 0)];
        let evidence = Confluence {
            bearish_fvgs: &gaps,
            resistance: &[1.5],
            ..Default::default()
        };
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 50);
    }

    #[test]
    fn test_level_proximity() {
        let scorer = ConfidenceScorer::default();
        let near = Confluence {
            support: &[1.2045],
            ..Default::default()
        };
        let far = Confluence {
            support: &[1.1900],
            ..Default::default()
        };
        assert_eq!(scorer.score(&buy_at(1.2050), &near), 65);
        assert_eq!(scorer.score(&buy_at(1.2050), &far), 50);
    }

    #[test]
    fn test_all_factors_hit_cap() {
        let scorer = ConfidenceScorer::default();
        let blocks = vec![block(1.40, 1.60)];
        let gaps = vec![Zone::new(ZoneKind::BullishFvg, 1.45, 1.55, 0, 0)];
        let patterns = vec![pattern(PatternKind::BullishEngulfing)];
        let evidence = Confluence {
            bullish_order_blocks: &blocks,
            bullish_fvgs: &gaps,
            support: &[1.5],
            patterns: &patterns,
            ..Default::default()
        };
        assert_eq!(scorer.factors(&buy_at(1.5), &evidence).len(), 4);
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 95);
    }

    #[test]
    fn test_hammer_supports_buy() {
        let scorer = ConfidenceScorer::default();
        let patterns = vec![pattern(PatternKind::Hammer)];
        let evidence = Confluence {
            patterns: &patterns,
            ..Default::default()
        };
        assert_eq!(
            scorer.factors(&buy_at(1.5), &evidence),
            vec![ConfluenceFactor::Pattern]
        );
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 65);
        // A bullish pattern says nothing about a sell
        assert_eq!(scorer.score(&sell_at(1.5), &evidence), 50);
    }

    #[test]
    fn test_evening_star_supports_sell() {
        let scorer = ConfidenceScorer::default();
        let patterns = vec![
            pattern(PatternKind::Doji),
            pattern(PatternKind::EveningStar),
        ];
        let evidence = Confluence {
            patterns: &patterns,
            ..Default::default()
        };
        assert_eq!(scorer.score(&sell_at(1.5), &evidence), 65);
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 50);
    }

    #[test]
    fn test_neutral_patterns_do_not_count() {
        let scorer = ConfidenceScorer::default();
        let patterns = vec![pattern(PatternKind::Doji), pattern(PatternKind::InsideBar)];
        let evidence = Confluence {
            patterns: &patterns,
            ..Default::default()
        };
        assert_eq!(scorer.score(&buy_at(1.5), &evidence), 50);
        assert_eq!(scorer.score(&sell_at(1.5), &evidence), 50);
    }

    #[test]
    fn test_invalid_cap() {
        let scorer = ConfidenceScorer {
            cap: 120,
            ..Default::default()
        };
        assert!(scorer.validate_config().is_err());

        let scorer = ConfidenceScorer {
            base_score: 96,
            ..Default::default()
        };
        assert!(scorer.validate_config().is_err());
    }
}
