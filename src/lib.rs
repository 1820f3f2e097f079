//! # Confluence - market-structure analysis for OHLC series
//!
//! Detects swing pivots, trend structure, supply/demand zones, order blocks,
//! fair-value gaps, liquidity pools, indicator signals and candlestick patterns,
//! then folds them into one trade suggestion with a confidence score and a
//! narrative.
//!
//! ## Quick Start
//!
//! ```rust
//! use confluence::prelude::*;
//!
//! let candles: Vec<Candle> = (0..120)
//!     .map(|i| {
//!         let mid = 100.0 + (i as f64 * 0.3).sin() * 5.0;
//!         Candle::new(i * 60, mid - 0.2, mid + 0.8, mid - 0.8, mid + 0.2)
//!     })
//!     .collect();
//!
//! let analyzer = AnalyzerBuilder::new().build().unwrap();
//! let analysis = analyzer.analyze("EURUSD", &candles).unwrap();
//! assert!(analysis.confidence <= 100);
//! ```

pub mod confidence;
pub mod detectors;
pub mod features;
pub mod narrative;
pub mod params;
pub mod suggestion;
pub mod timeframes;

pub mod prelude {
    pub use crate::{
        // Synthesis
        confidence::{ConfidenceScorer, Confluence, ConfluenceFactor},
        // Detectors
        detectors::*,
        features::FeatureVector,
        narrative::Narrative,
        // Parameters
        params::{get_factor, get_period, get_ratio, AnalysisConfig, ParamMeta, ParamType},
        suggestion::{Action, Suggestion, SuggestionEngine, TradeLevels, ZoneSet},
        timeframes::{analyze_timeframes, TimeframeConsensus, TimeframeOutcome, DEFAULT_MIN_CONFLUENCE},
        // Parallel
        analyze_parallel,
        // Engine
        Analysis,
        AnalysisError,
        AnalysisFailure,
        Analyzer,
        AnalyzerBuilder,
        // Types
        Candle,
        DetectorFailure,
        DetectorKind,
        Direction,
        OHLCVExt,
        Period,
        Pivot,
        PivotKind,
        Ratio,
        Result,
        Trend,
        Zone,
        ZoneKind,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use confidence::Confluence;
use detectors::{
    helpers, IndicatorSnapshot, LiquidityPools, MarketStructure, OrderBlock, PatternMatch,
};
use narrative::Narrative;
use params::AnalysisConfig;
use suggestion::{Suggestion, ZoneSet};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while validating configuration or input series
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid candle at index {index}: {reason}")]
    InvalidCandle { index: usize, reason: &'static str },

    #[error("Non-monotonic time at index {index}: {time} does not follow {previous}")]
    NonMonotonicTime {
        index: usize,
        previous: i64,
        time: i64,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length or count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core bar data trait
pub trait OHLCV {
    fn time(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Traded volume, when the data source provides it
    fn volume(&self) -> Option<f64> {
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn time(&self) -> i64 {
        (**self).time()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> Option<f64> {
        (**self).volume()
    }
}

/// Extension trait with computed properties for bar data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn body_midpoint(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate bar consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "high < low",
            });
        }
        let (low, high) = (self.low(), self.high());
        if !(low..=high).contains(&self.open()) || !(low..=high).contains(&self.close()) {
            return Err(AnalysisError::InvalidCandle {
                index: 0,
                reason: "open/close outside the high-low range",
            });
        }
        if let Some(volume) = self.volume() {
            if !volume.is_finite() || volume < 0.0 {
                return Err(AnalysisError::InvalidCandle {
                    index: 0,
                    reason: "volume must be finite and non-negative",
                });
            }
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Plain bar record, as delivered by a market-data collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl OHLCV for Candle {
    fn time(&self) -> i64 {
        self.time
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<f64> {
        self.volume
    }
}

/// Check every bar and the ordering of timestamps
pub fn validate_series<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidCandle { reason, .. } => {
                AnalysisError::InvalidCandle { index: i, reason }
            }
            other => other,
        })?;
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].time() <= pair[0].time() {
            return Err(AnalysisError::NonMonotonicTime {
                index: i + 1,
                previous: pair[0].time(),
                time: pair[1].time(),
            });
        }
    }
    Ok(())
}

// ============================================================
// DIRECTION & TREND
// ============================================================

/// Directional bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Three-way market-structure classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    #[default]
    Ranging,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::Uptrend)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::Downtrend)
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Uptrend => "Uptrend",
            Trend::Downtrend => "Downtrend",
            Trend::Ranging => "Ranging",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================
// PIVOTS & ZONES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// Swing point. `index` refers into the analyzed slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub kind: PivotKind,
    pub price: f64,
    pub index: usize,
    pub time: i64,
}

/// Every price band the detectors emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Demand,
    Supply,
    BullishOrderBlock,
    BearishOrderBlock,
    BullishFvg,
    BearishFvg,
}

impl ZoneKind {
    pub fn direction(self) -> Direction {
        match self {
            ZoneKind::Demand | ZoneKind::BullishOrderBlock | ZoneKind::BullishFvg => {
                Direction::Bullish
            }
            ZoneKind::Supply | ZoneKind::BearishOrderBlock | ZoneKind::BearishFvg => {
                Direction::Bearish
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ZoneKind::Demand => "demand zone",
            ZoneKind::Supply => "supply zone",
            ZoneKind::BullishOrderBlock => "bullish order block",
            ZoneKind::BearishOrderBlock => "bearish order block",
            ZoneKind::BullishFvg => "bullish FVG",
            ZoneKind::BearishFvg => "bearish FVG",
        }
    }
}

/// Price band `[low, high]` anchored at a bar of the analyzed slice.
///
/// `mitigated` only ever moves from `false` to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub high: f64,
    pub low: f64,
    pub time: i64,
    pub index: usize,
    mitigated: bool,
}

impl Zone {
    /// Bounds are ordered, so `high >= low` whatever order they are passed in.
    pub fn new(kind: ZoneKind, a: f64, b: f64, time: i64, index: usize) -> Self {
        Self {
            kind,
            high: a.max(b),
            low: a.min(b),
            time,
            index,
            mitigated: false,
        }
    }

    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn is_mitigated(&self) -> bool {
        self.mitigated
    }

    pub fn mark_mitigated(&mut self) {
        self.mitigated = true;
    }

    /// Bullish bands are revisited from above, bearish bands from below.
    pub fn is_revisited_by<T: OHLCV>(&self, bar: &T) -> bool {
        match self.kind.direction() {
            Direction::Bearish => bar.high() >= self.low,
            _ => bar.low() <= self.high,
        }
    }

    pub fn same_bounds(&self, other: &Zone) -> bool {
        self.high == other.high && self.low == other.low
    }

    /// Widen to the union of both bands, keeping the most recent anchor.
    pub fn absorb(&mut self, other: &Zone) {
        self.high = self.high.max(other.high);
        self.low = self.low.min(other.low);
        if (other.time, other.index) > (self.time, self.index) {
            self.time = other.time;
            self.index = other.index;
        }
    }
}

// ============================================================
// ANALYSIS RECORD
// ============================================================

/// Stage of the pipeline, used to report isolated failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    Pivots,
    Structure,
    Zones,
    OrderBlocks,
    FairValueGaps,
    Liquidity,
    Indicators,
    Patterns,
    Suggestion,
    Confidence,
}

/// A detector that was skipped; the rest of the analysis is still valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: DetectorKind,
    pub message: String,
}

/// Everything detected for one (symbol, timeframe, series) call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub symbol: String,
    pub timeframe: Option<String>,
    pub current_price: f64,
    pub structure: MarketStructure,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub pivots: Vec<Pivot>,
    pub demand_zones: Vec<Zone>,
    pub supply_zones: Vec<Zone>,
    pub bullish_order_blocks: Vec<OrderBlock>,
    pub bearish_order_blocks: Vec<OrderBlock>,
    pub bullish_fvgs: Vec<Zone>,
    pub bearish_fvgs: Vec<Zone>,
    pub liquidity: LiquidityPools,
    pub indicators: IndicatorSnapshot,
    pub patterns: Vec<PatternMatch>,
    pub suggestion: Suggestion,
    /// 0..=100
    pub confidence: u8,
    pub narrative: Narrative,
    pub failures: Vec<DetectorFailure>,
}

impl Analysis {
    pub fn zone_set(&self) -> ZoneSet<'_> {
        ZoneSet {
            demand: &self.demand_zones,
            supply: &self.supply_zones,
            bullish_order_blocks: &self.bullish_order_blocks,
            bearish_order_blocks: &self.bearish_order_blocks,
            bullish_fvgs: &self.bullish_fvgs,
            bearish_fvgs: &self.bearish_fvgs,
        }
    }

    pub fn confluence(&self) -> Confluence<'_> {
        Confluence {
            bullish_order_blocks: &self.bullish_order_blocks,
            bearish_order_blocks: &self.bearish_order_blocks,
            bullish_fvgs: &self.bullish_fvgs,
            bearish_fvgs: &self.bearish_fvgs,
            support: &self.support,
            resistance: &self.resistance,
            patterns: &self.patterns,
        }
    }

    pub fn trend(&self) -> Trend {
        self.structure.trend
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Stateless analysis engine. Holds only validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a series with the engine's configuration.
    pub fn analyze<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<Analysis> {
        run_analysis(symbol, None, bars, &self.config)
    }

    /// Same as [`Analyzer::analyze`], tagging the result with a timeframe label.
    pub fn analyze_timeframe<T: OHLCV>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
    ) -> Result<Analysis> {
        run_analysis(symbol, Some(timeframe), bars, &self.config)
    }

    /// Analyze with a per-call configuration.
    ///
    /// The configuration is not validated up front: a detector whose settings
    /// are invalid is skipped and reported in [`Analysis::failures`].
    pub fn analyze_with<T: OHLCV>(
        &self,
        symbol: &str,
        bars: &[T],
        config: &AnalysisConfig,
    ) -> Result<Analysis> {
        run_analysis(symbol, None, bars, config)
    }
}

/// Run `detect` only if `check` passed; otherwise record the failure and fall back to empty output.
fn isolate<R: Default>(
    failures: &mut Vec<DetectorFailure>,
    detector: DetectorKind,
    check: Result<()>,
    detect: impl FnOnce() -> R,
) -> R {
    match check {
        Ok(()) => detect(),
        Err(error) => {
            warn!(?detector, %error, "detector skipped");
            failures.push(DetectorFailure {
                detector,
                message: error.to_string(),
            });
            R::default()
        }
    }
}

fn run_analysis<T: OHLCV>(
    symbol: &str,
    timeframe: Option<&str>,
    bars: &[T],
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let _span =
        tracing::debug_span!("analyze", symbol, timeframe = ?timeframe, bars = bars.len()).entered();

    validate_series(bars)?;
    let last = bars
        .last()
        .ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })?;
    let current_price = last.close();
    let mut failures = Vec::new();

    let pivots = isolate(
        &mut failures,
        DetectorKind::Pivots,
        config.pivots.validate_config(),
        || config.pivots.detect(bars),
    );
    debug!(count = pivots.len(), "pivots detected");

    let (structure, (support, resistance)) = isolate(
        &mut failures,
        DetectorKind::Structure,
        config.structure.validate_config(),
        || {
            (
                config.structure.classify(&pivots),
                config.structure.levels(&pivots),
            )
        },
    );
    debug!(trend = %structure.trend, "market structure classified");

    // One trailing mean range feeds both the zone and the gap scans
    let mean_range = helpers::mean_range(bars, config.zones.lookback.get());

    let zones = isolate(
        &mut failures,
        DetectorKind::Zones,
        config.zones.validate_config(),
        || config.zones.detect(bars, mean_range),
    );
    debug!(
        demand = zones.demand.len(),
        supply = zones.supply.len(),
        mean_range,
        "supply/demand zones"
    );

    let order_blocks = isolate(
        &mut failures,
        DetectorKind::OrderBlocks,
        config.order_blocks.validate_config(),
        || config.order_blocks.detect(bars, &pivots),
    );
    debug!(
        bullish = order_blocks.bullish.len(),
        bearish = order_blocks.bearish.len(),
        "order blocks"
    );

    let fvgs = isolate(
        &mut failures,
        DetectorKind::FairValueGaps,
        config.fvgs.validate_config(),
        || config.fvgs.detect(bars, mean_range),
    );
    debug!(
        bullish = fvgs.bullish.len(),
        bearish = fvgs.bearish.len(),
        "fair value gaps"
    );

    let liquidity = isolate(
        &mut failures,
        DetectorKind::Liquidity,
        config.liquidity.validate_config(),
        || config.liquidity.detect(&pivots),
    );
    debug!(
        buy_side = liquidity.buy_side.len(),
        sell_side = liquidity.sell_side.len(),
        "liquidity pools"
    );

    let indicators = isolate(
        &mut failures,
        DetectorKind::Indicators,
        config.indicators.validate_config(),
        || config.indicators.compute(bars, &pivots),
    );

    let patterns = isolate(
        &mut failures,
        DetectorKind::Patterns,
        config.patterns.validate_config(),
        || config.patterns.recent(bars),
    );
    debug!(count = patterns.len(), "candlestick patterns");

    let mut analysis = Analysis {
        symbol: symbol.to_string(),
        timeframe: timeframe.map(str::to_string),
        current_price,
        structure,
        support,
        resistance,
        pivots,
        demand_zones: zones.demand,
        supply_zones: zones.supply,
        bullish_order_blocks: order_blocks.bullish,
        bearish_order_blocks: order_blocks.bearish,
        bullish_fvgs: fvgs.bullish,
        bearish_fvgs: fvgs.bearish,
        liquidity,
        indicators,
        patterns,
        suggestion: Suggestion::default(),
        confidence: 0,
        narrative: Narrative::default(),
        failures: Vec::new(),
    };

    analysis.suggestion = isolate(
        &mut failures,
        DetectorKind::Suggestion,
        config.suggestion.validate_config(),
        || {
            config.suggestion.suggest(
                current_price,
                analysis.structure.trend,
                &analysis.zone_set(),
                &analysis.liquidity,
            )
        },
    );

    analysis.confidence = isolate(
        &mut failures,
        DetectorKind::Confidence,
        config.confidence.validate_config(),
        || {
            config
                .confidence
                .score(&analysis.suggestion, &analysis.confluence())
        },
    );

    analysis.narrative = Narrative::from_analysis(&analysis);
    analysis.failures = failures;

    info!(
        symbol,
        trend = %analysis.structure.trend,
        action = ?analysis.suggestion.action,
        confidence = analysis.confidence,
        "analysis complete"
    );

    Ok(analysis)
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Analyzer instances
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply named overrides (see [`AnalysisConfig::param_meta`])
    pub fn params(mut self, params: &std::collections::HashMap<&str, f64>) -> Result<Self> {
        self.config = self.config.apply_params(params)?;
        Ok(self)
    }

    pub fn pivot_window(mut self, window: Period) -> Self {
        self.config.pivots.window = window;
        self
    }

    pub fn structure_lookback(mut self, lookback: Period) -> Self {
        self.config.structure.lookback = lookback;
        self
    }

    pub fn zone_lookback(mut self, lookback: Period) -> Self {
        self.config.zones.lookback = lookback;
        self
    }

    pub fn zone_threshold(mut self, multiplier: f64) -> Self {
        self.config.zones.threshold_multiplier = multiplier;
        self
    }

    pub fn zone_merge_tolerance(mut self, multiplier: f64) -> Self {
        self.config.zones.tolerance_multiplier = multiplier;
        self
    }

    pub fn liquidity_tolerance_percent(mut self, percent: f64) -> Self {
        self.config.liquidity.tolerance_percent = percent;
        self
    }

    pub fn ema_periods(mut self, periods: impl IntoIterator<Item = Period>) -> Self {
        self.config.indicators.ema_periods = periods.into_iter().collect();
        self
    }

    pub fn rsi_period(mut self, period: Period) -> Self {
        self.config.indicators.rsi_period = period;
        self
    }

    /// Fast/slow EMA pair watched for golden and death crosses
    pub fn ema_cross(mut self, fast: Period, slow: Period) -> Self {
        self.config.indicators.cross_fast = fast;
        self.config.indicators.cross_slow = slow;
        self
    }

    pub fn stop_buffer(mut self, buffer: Ratio) -> Self {
        self.config.suggestion.stop_buffer = buffer;
        self
    }

    pub fn risk_reward(mut self, ratio: f64) -> Self {
        self.config.suggestion.risk_reward = ratio;
        self
    }

    /// Build the analyzer, validating every detector's configuration
    pub fn build(self) -> Result<Analyzer> {
        Analyzer::new(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Error from analyzing a single instrument
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Analyze many independent series in parallel. Output order follows input order.
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<Analysis>, Vec<AnalysisFailure>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer
                .analyze(symbol, bars)
                .map_err(|error| AnalysisFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
