//! Candlestick patterns
//!
//! Ten classic shapes: engulfing, morning/evening star, the hammer family,
//! doji and inside bar. Each detector looks at the bar at `index` and the
//! bars before it, never after.

use serde::{Deserialize, Serialize};

use super::helpers::prior_trend;
use crate::{AnalysisError, Direction, OHLCVExt, Period, Ratio, Result, OHLCV};

// ============================================================
// PATTERN TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    Doji,
    InsideBar,
}

impl PatternKind {
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::MorningStar => "Morning Star",
            PatternKind::EveningStar => "Evening Star",
            PatternKind::Hammer => "Hammer",
            PatternKind::HangingMan => "Hanging Man",
            PatternKind::InvertedHammer => "Inverted Hammer",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::Doji => "Doji",
            PatternKind::InsideBar => "Inside Bar",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            PatternKind::BullishEngulfing
            | PatternKind::MorningStar
            | PatternKind::Hammer
            | PatternKind::InvertedHammer => Direction::Bullish,
            PatternKind::BearishEngulfing
            | PatternKind::EveningStar
            | PatternKind::HangingMan
            | PatternKind::ShootingStar => Direction::Bearish,
            PatternKind::Doji | PatternKind::InsideBar => Direction::Neutral,
        }
    }

    /// Chart markers sit below bullish patterns and above everything else
    pub fn position(self) -> MarkerPosition {
        if self.direction().is_bullish() {
            MarkerPosition::Below
        } else {
            MarkerPosition::Above
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerPosition {
    Above,
    Below,
}

/// Pattern found at a bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub index: usize,
    pub time: i64,
    pub position: MarkerPosition,
    /// Bar low for markers below, bar high for markers above
    pub price: f64,
}

impl PatternMatch {
    pub fn new<T: OHLCV>(kind: PatternKind, index: usize, bar: &T) -> Self {
        let position = kind.position();
        let price = match position {
            MarkerPosition::Below => bar.low(),
            MarkerPosition::Above => bar.high(),
        };
        Self {
            kind,
            index,
            time: bar.time(),
            position,
            price,
        }
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Core pattern detection trait
pub trait PatternDetector: Send + Sync {
    /// Minimum number of bars up to and including `index`
    fn min_bars(&self) -> usize;

    /// Detect pattern at given index
    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind>;

    /// Validate detector configuration
    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// DETECTORS
// ============================================================

/// Bullish or bearish engulfing of the previous body
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let prev = bars.get(index.checked_sub(1)?)?;
        let curr = bars.get(index)?;

        if prev.is_bearish()
            && curr.is_bullish()
            && curr.close() > prev.open()
            && curr.open() < prev.close()
        {
            Some(PatternKind::BullishEngulfing)
        } else if prev.is_bullish()
            && curr.is_bearish()
            && curr.close() < prev.open()
            && curr.open() > prev.close()
        {
            Some(PatternKind::BearishEngulfing)
        } else {
            None
        }
    }
}

/// Morning and evening star
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarDetector {
    /// Outer candles' body as a share of their range
    pub strong_body: Ratio,
    /// Middle body as a share of the first candle's body
    pub small_body: Ratio,
}

impl Default for StarDetector {
    fn default() -> Self {
        Self {
            strong_body: Ratio::new_const(0.5),
            small_body: Ratio::new_const(0.3),
        }
    }
}

impl PatternDetector for StarDetector {
    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let first = bars.get(index.checked_sub(2)?)?;
        let star = bars.get(index - 1)?;
        let last = bars.get(index)?;

        let strong = |bar: &T| bar.range() > 0.0 && bar.body() >= bar.range() * self.strong_body.get();
        if !strong(first) || !strong(last) {
            return None;
        }
        if star.body() > first.body() * self.small_body.get() {
            return None;
        }

        let midpoint = first.body_midpoint();
        if first.is_bearish() && last.is_bullish() && last.close() > midpoint {
            Some(PatternKind::MorningStar)
        } else if first.is_bullish() && last.is_bearish() && last.close() < midpoint {
            Some(PatternKind::EveningStar)
        } else {
            None
        }
    }
}

/// Long lower wick with the body near the top: hammer after a decline,
/// hanging man after a rise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HammerDetector {
    /// Wick must exceed body times this
    pub wick_to_body: f64,
    /// Body must sit within this share of the range from the top
    pub body_zone: Ratio,
    pub trend_bars: Period,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            wick_to_body: 2.0,
            body_zone: Ratio::new_const(0.2),
            trend_bars: Period::new_const(3),
        }
    }
}

impl PatternDetector for HammerDetector {
    fn min_bars(&self) -> usize {
        self.trend_bars.get().saturating_add(2)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let bar = bars.get(index)?;
        let range = bar.range();
        if range <= 0.0 || bar.lower_shadow() <= bar.body() * self.wick_to_body {
            return None;
        }
        if bar.body_bottom() < bar.high() - range * self.body_zone.get() {
            return None;
        }

        match prior_trend(bars, index, self.trend_bars.get())? {
            Direction::Bearish => Some(PatternKind::Hammer),
            Direction::Bullish => Some(PatternKind::HangingMan),
            Direction::Neutral => None,
        }
    }

    fn validate_config(&self) -> Result<()> {
        validate_wick_ratio(self.wick_to_body)
    }
}

/// Long upper wick with the body near the bottom: inverted hammer after a
/// decline, shooting star after a rise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvertedHammerDetector {
    pub wick_to_body: f64,
    /// Body must sit within this share of the range from the bottom
    pub body_zone: Ratio,
    pub trend_bars: Period,
}

impl Default for InvertedHammerDetector {
    fn default() -> Self {
        Self {
            wick_to_body: 2.0,
            body_zone: Ratio::new_const(0.2),
            trend_bars: Period::new_const(3),
        }
    }
}

impl PatternDetector for InvertedHammerDetector {
    fn min_bars(&self) -> usize {
        self.trend_bars.get().saturating_add(2)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let bar = bars.get(index)?;
        let range = bar.range();
        if range <= 0.0 || bar.upper_shadow() <= bar.body() * self.wick_to_body {
            return None;
        }
        if bar.body_top() > bar.low() + range * self.body_zone.get() {
            return None;
        }

        match prior_trend(bars, index, self.trend_bars.get())? {
            Direction::Bearish => Some(PatternKind::InvertedHammer),
            Direction::Bullish => Some(PatternKind::ShootingStar),
            Direction::Neutral => None,
        }
    }

    fn validate_config(&self) -> Result<()> {
        validate_wick_ratio(self.wick_to_body)
    }
}

fn validate_wick_ratio(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "wick-to-body ratio must be non-negative, got {value}"
        )));
    }
    Ok(())
}

/// Body no larger than `doji_ratio` of the range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DojiDetector {
    pub doji_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            doji_ratio: Ratio::new_const(0.1),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let ratio = bars.get(index)?.body_ratio()?;
        (ratio <= self.doji_ratio.get()).then_some(PatternKind::Doji)
    }
}

/// Range strictly smaller than, and contained by, the previous bar's
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InsideBarDetector;

impl PatternDetector for InsideBarDetector {
    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
        let prev = bars.get(index.checked_sub(1)?)?;
        let curr = bars.get(index)?;
        let inside = curr.high() <= prev.high()
            && curr.low() >= prev.low()
            && curr.range() < prev.range();
        inside.then_some(PatternKind::InsideBar)
    }
}

// ============================================================
// BUILTIN DETECTOR ENUM
// ============================================================

macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternKind> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }

        impl BuiltinDetector {
            /// Every builtin detector with default settings
            pub fn all() -> Vec<Self> {
                vec![$(Self::$variant(<$detector>::default())),*]
            }
        }
    };
}

define_builtin_detectors! {
    Engulfing(EngulfingDetector),
    Star(StarDetector),
    Hammer(HammerDetector),
    InvertedHammer(InvertedHammerDetector),
    Doji(DojiDetector),
    InsideBar(InsideBarDetector),
}

// ============================================================
// MATCHER
// ============================================================

/// Runs a set of pattern detectors over a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternMatcher {
    pub detectors: Vec<BuiltinDetector>,
    /// Most recent matches kept by [`PatternMatcher::recent`]
    pub max_patterns: Period,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self {
            detectors: BuiltinDetector::all(),
            max_patterns: Period::new_const(5),
        }
    }
}

impl PatternMatcher {
    pub fn validate_config(&self) -> Result<()> {
        self.detectors.iter().try_for_each(BuiltinDetector::validate_config)
    }

    /// Every match in bar order; detectors run in configured order per bar
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        for (index, bar) in bars.iter().enumerate() {
            for detector in &self.detectors {
                if index + 1 < detector.min_bars() {
                    continue;
                }
                if let Some(kind) = detector.detect(bars, index) {
                    matches.push(PatternMatch::new(kind, index, bar));
                }
            }
        }
        matches
    }

    /// The last `max_patterns` matches, oldest first
    pub fn recent<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        let mut matches = self.scan(bars);
        let excess = matches.len().saturating_sub(self.max_patterns.get());
        matches.drain(..excess);
        matches
    }
}
