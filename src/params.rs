//! Analysis configuration and parameter metadata
//!
//! [`AnalysisConfig`] groups the tunable settings of every detector. Each field
//! is the detector itself, so a detector's defaults live next to its logic.
//! Named overrides can be applied from a flat map, which is how optimizers and
//! configuration files talk to the engine.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use confluence::params::AnalysisConfig;
//!
//! let mut params = HashMap::new();
//! params.insert("pivot_window", 3.0);
//! params.insert("risk_reward", 3.0);
//!
//! let config = AnalysisConfig::with_params(&params).unwrap();
//! assert_eq!(config.pivots.window.get(), 3);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceScorer;
use crate::detectors::{
  FvgDetector, IndicatorEngine, LiquidityClusterer, OrderBlockDetector, PatternMatcher,
  PivotDetector, StructureClassifier, ZoneDetector,
};
use crate::suggestion::SuggestionEngine;
use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Non-negative multiplier or percentage
  Factor,
}

/// Metadata for a single analysis parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "pivot_window")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max)
  pub range: (f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if value.is_nan() {
      return Err(AnalysisError::InvalidValue("parameter cannot be NaN"));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Factor => Ok(()),
    }
  }
}

static PARAMS: &[ParamMeta] = &[
  ParamMeta::period("pivot_window", 5.0, (1.0, 50.0), "Bars on each side a swing point must beat"),
  ParamMeta::period("structure_lookback", 10.0, (2.0, 200.0), "Recent swings per side used to classify trend"),
  ParamMeta::period("level_count", 3.0, (1.0, 20.0), "Support/resistance levels reported per side"),
  ParamMeta::period("zone_lookback", 50.0, (2.0, 1000.0), "Bars averaged for the mean candle range"),
  ParamMeta::factor("zone_threshold", 1.5, (1.0, 10.0), "Explosive candle range, in mean ranges"),
  ParamMeta::factor("zone_merge_tolerance", 0.5, (0.0, 5.0), "Zone merge distance, in zone heights"),
  ParamMeta::period("zone_keep", 2.0, (1.0, 50.0), "Most recent zones kept per side"),
  ParamMeta::period("order_block_keep", 2.0, (1.0, 50.0), "Most recent order blocks kept per side"),
  ParamMeta::period("fvg_keep", 2.0, (1.0, 50.0), "Most recent gaps kept per side"),
  ParamMeta::factor("fvg_min_size", 0.0, (0.0, 10.0), "Minimum gap height, in mean ranges"),
  ParamMeta::factor("liquidity_tolerance_percent", 0.1, (0.0, 10.0), "Clustering tolerance, percent of price"),
  ParamMeta::period("rsi_period", 14.0, (2.0, 200.0), "RSI smoothing period"),
  ParamMeta::period("ema_cross_fast", 50.0, (1.0, 500.0), "Fast EMA for cross detection"),
  ParamMeta::period("ema_cross_slow", 200.0, (2.0, 1000.0), "Slow EMA for cross detection"),
  ParamMeta::period("ema_cross_lookback", 5.0, (1.0, 100.0), "Trailing bars scanned for crosses"),
  ParamMeta::period("volume_bins", 20.0, (1.0, 500.0), "Price buckets in the volume profile"),
  ParamMeta::period("high_volume_percentile", 75.0, (1.0, 100.0), "Bucket percentile marking a high-volume node"),
  ParamMeta::period("pattern_limit", 5.0, (1.0, 100.0), "Most recent candlestick patterns reported"),
  ParamMeta::ratio("stop_buffer", 0.001, (0.0, 0.1), "Stop distance beyond the zone, fraction of price"),
  ParamMeta::factor("risk_reward", 2.0, (0.1, 20.0), "Fallback take-profit multiple of risk"),
];

// ============================================================
// ANALYSIS CONFIG
// ============================================================

/// Settings for a whole analysis pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
  pub pivots: PivotDetector,
  pub structure: StructureClassifier,
  pub zones: ZoneDetector,
  pub order_blocks: OrderBlockDetector,
  pub fvgs: FvgDetector,
  pub liquidity: LiquidityClusterer,
  pub indicators: IndicatorEngine,
  pub patterns: PatternMatcher,
  pub suggestion: SuggestionEngine,
  pub confidence: ConfidenceScorer,
}

impl AnalysisConfig {
  /// Returns metadata for all named parameters
  pub fn param_meta() -> &'static [ParamMeta] {
    PARAMS
  }

  /// Defaults with named overrides applied.
  ///
  /// Missing parameters use their default values; unknown names are rejected.
  pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Self::default().apply_params(params)
  }

  /// Apply named overrides on top of this configuration
  pub fn apply_params(&self, params: &HashMap<&str, f64>) -> Result<Self> {
    for (key, value) in params {
      let meta = PARAMS
        .iter()
        .find(|m| m.name == *key)
        .ok_or_else(|| AnalysisError::InvalidConfig(format!("unknown parameter `{key}`")))?;
      meta.validate(*value)?;
    }

    let mut config = self.clone();
    config.pivots.window = get_period(params, "pivot_window", self.pivots.window.get())?;
    config.structure.lookback =
      get_period(params, "structure_lookback", self.structure.lookback.get())?;
    config.structure.max_levels = get_period(params, "level_count", self.structure.max_levels.get())?;
    config.zones.lookback = get_period(params, "zone_lookback", self.zones.lookback.get())?;
    config.zones.threshold_multiplier =
      get_factor(params, "zone_threshold", self.zones.threshold_multiplier)?;
    config.zones.tolerance_multiplier =
      get_factor(params, "zone_merge_tolerance", self.zones.tolerance_multiplier)?;
    config.zones.keep = get_period(params, "zone_keep", self.zones.keep.get())?;
    config.order_blocks.keep = get_period(params, "order_block_keep", self.order_blocks.keep.get())?;
    config.fvgs.keep = get_period(params, "fvg_keep", self.fvgs.keep.get())?;
    config.fvgs.min_size_factor = get_factor(params, "fvg_min_size", self.fvgs.min_size_factor)?;
    config.liquidity.tolerance_percent =
      get_factor(params, "liquidity_tolerance_percent", self.liquidity.tolerance_percent)?;
    config.indicators.rsi_period = get_period(params, "rsi_period", self.indicators.rsi_period.get())?;
    config.indicators.cross_fast =
      get_period(params, "ema_cross_fast", self.indicators.cross_fast.get())?;
    config.indicators.cross_slow =
      get_period(params, "ema_cross_slow", self.indicators.cross_slow.get())?;
    config.indicators.cross_lookback =
      get_period(params, "ema_cross_lookback", self.indicators.cross_lookback.get())?;
    config.indicators.volume_bins =
      get_period(params, "volume_bins", self.indicators.volume_bins.get())?;
    config.indicators.high_volume_percentile = get_period(
      params,
      "high_volume_percentile",
      self.indicators.high_volume_percentile.get(),
    )?;
    config.patterns.max_patterns =
      get_period(params, "pattern_limit", self.patterns.max_patterns.get())?;
    config.suggestion.stop_buffer =
      get_ratio(params, "stop_buffer", self.suggestion.stop_buffer.get())?;
    config.suggestion.risk_reward = get_factor(params, "risk_reward", self.suggestion.risk_reward)?;

    config.validate()?;
    Ok(config)
  }

  /// Validate every detector's settings, stopping at the first problem
  pub fn validate(&self) -> Result<()> {
    self.pivots.validate_config()?;
    self.structure.validate_config()?;
    self.zones.validate_config()?;
    self.order_blocks.validate_config()?;
    self.fvgs.validate_config()?;
    self.liquidity.validate_config()?;
    self.indicators.validate_config()?;
    self.patterns.validate_config()?;
    self.suggestion.validate_config()?;
    self.confidence.validate_config()
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

/// Helper to get a finite, non-negative multiplier from params with default fallback
pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !value.is_finite() || value < 0.0 {
    return Err(AnalysisError::InvalidValue("factor must be finite and non-negative"));
  }
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
