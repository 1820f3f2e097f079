//! Market-structure detectors
//!
//! Every detector is a small value type holding its own settings, with
//! `Default` giving the standard configuration and `validate_config`
//! checking custom values.
//!
//! # Detector Stages
//!
//! - **Pivots**: swing highs and lows over a symmetric window
//! - **Structure**: trend classification plus support/resistance levels
//! - **Zones**: supply/demand bases in front of explosive candles
//! - **Order blocks**: last opposing candle before a sweep and break of structure
//! - **FVG**: three-candle imbalances
//! - **Liquidity**: clusters of equal highs and equal lows
//! - **Indicators**: EMA, RSI, divergence, EMA crosses, volume profile
//! - **Candlestick**: ten classic reversal and indecision patterns

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod candlestick;
pub mod fvg;
pub mod indicators;
pub mod liquidity;
pub mod order_blocks;
pub mod pivots;
pub mod structure;
pub mod zones;

// Re-export all detectors for convenience
pub use candlestick::*;
pub use fvg::*;
pub use indicators::*;
pub use liquidity::*;
pub use order_blocks::*;
pub use pivots::*;
pub use structure::*;
pub use zones::*;

impl_with_defaults!(
  PivotDetector,
  StructureClassifier,
  ZoneDetector,
  OrderBlockDetector,
  FvgDetector,
  LiquidityClusterer,
  IndicatorEngine,
  PatternMatcher,
);
