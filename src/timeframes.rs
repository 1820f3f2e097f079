//! Multi-timeframe analysis and consensus
//!
//! Each timeframe is analyzed independently; a failure on one does not
//! affect the others. The consensus takes the majority non-neutral action.
//! Execution uses the suggestion of the first timeframe that analyzed
//! successfully, and only once enough timeframes agree.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::suggestion::{Action, Suggestion};
use crate::{Analysis, AnalysisError, Analyzer, OHLCV};

/// Result of analyzing one timeframe
#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeOutcome {
    pub timeframe: String,
    pub result: std::result::Result<Analysis, AnalysisError>,
}

/// Analyze each `(timeframe, bars)` series in parallel. Output order follows input order.
pub fn analyze_timeframes<T: OHLCV + Sync>(
    analyzer: &Analyzer,
    symbol: &str,
    series: &[(&str, &[T])],
) -> Vec<TimeframeOutcome> {
    series
        .par_iter()
        .map(|(timeframe, bars)| {
            let result = analyzer.analyze_timeframe(symbol, timeframe, bars);
            if let Err(error) = &result {
                warn!(symbol, timeframe, %error, "timeframe analysis failed");
            }
            TimeframeOutcome {
                timeframe: timeframe.to_string(),
                result,
            }
        })
        .collect()
}

/// Agreeing timeframes required before a consensus is traded
pub const DEFAULT_MIN_CONFLUENCE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeVote {
    pub timeframe: String,
    pub action: Action,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeConsensus {
    pub action: Action,
    /// 0 for a neutral consensus
    pub confidence: u8,
    /// Timeframes whose action matches the consensus
    pub agreeing: Vec<String>,
    pub votes: Vec<TimeframeVote>,
    /// First timeframe, in input order, that analyzed successfully
    pub primary_timeframe: Option<String>,
    /// Suggestion of `primary_timeframe`
    pub primary: Option<Suggestion>,
    pub failed: Vec<String>,
}

impl TimeframeConsensus {
    /// Majority vote over Buy and Sell. A tie or no directional votes gives
    /// Neutral. Confidence averages `30 + 20 * agreeing` with the agreeing
    /// timeframes' mean confidence, clamped to 0..=100.
    pub fn from_outcomes(outcomes: &[TimeframeOutcome]) -> Self {
        let mut votes = Vec::new();
        let mut failed = Vec::new();
        let mut analyses = Vec::new();
        for outcome in outcomes {
            match &outcome.result {
                Ok(analysis) => {
                    votes.push(TimeframeVote {
                        timeframe: outcome.timeframe.clone(),
                        action: analysis.suggestion.action,
                        confidence: analysis.confidence,
                    });
                    analyses.push(analysis);
                }
                Err(_) => failed.push(outcome.timeframe.clone()),
            }
        }

        let count = |action: Action| votes.iter().filter(|v| v.action == action).count();
        let (buys, sells) = (count(Action::Buy), count(Action::Sell));
        let action = if buys > sells {
            Action::Buy
        } else if sells > buys {
            Action::Sell
        } else {
            Action::Neutral
        };

        let primary_timeframe = votes.first().map(|v| v.timeframe.clone());
        let primary = analyses.first().map(|a| a.suggestion.clone());

        if action == Action::Neutral {
            return Self {
                action,
                confidence: 0,
                agreeing: Vec::new(),
                votes,
                primary_timeframe,
                primary,
                failed,
            };
        }

        let agreeing: Vec<&TimeframeVote> = votes.iter().filter(|v| v.action == action).collect();
        let mean = agreeing.iter().map(|v| f64::from(v.confidence)).sum::<f64>()
            / agreeing.len() as f64;
        let base = 30.0 + 20.0 * agreeing.len() as f64;
        let confidence = ((base + mean) / 2.0).clamp(0.0, 100.0) as u8;

        let agreeing = agreeing.iter().map(|v| v.timeframe.clone()).collect();
        debug!(?action, confidence, "timeframe consensus");

        Self {
            action,
            confidence,
            agreeing,
            votes,
            primary_timeframe,
            primary,
            failed,
        }
    }

    /// The primary suggestion, when at least `min_confluence` timeframes
    /// agree on a direction and the primary timeframe agrees with them.
    pub fn tradeable(&self, min_confluence: usize) -> Option<&Suggestion> {
        if self.action == Action::Neutral || self.agreeing.len() < min_confluence {
            return None;
        }
        self.primary.as_ref().filter(|s| s.action == self.action)
    }
}
