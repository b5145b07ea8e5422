//! Millilitre and drop conversion for IV drip calculations.

use serde::Serialize;

/// Standard macro-drip factor.
pub const DROPS_PER_ML: f64 = 20.0;

/// Whole drops for a volume. Non-positive or non-finite input yields 0.
pub fn ml_to_drops(ml: f64) -> f64 {
    if !ml.is_finite() || ml <= 0.0 {
        return 0.0;
    }
    (ml * DROPS_PER_ML).round()
}

/// Volume for a drop count, rounded to two decimals.
pub fn drops_to_ml(drops: f64) -> f64 {
    if !drops.is_finite() || drops <= 0.0 {
        return 0.0;
    }
    (drops / DROPS_PER_ML * 100.0).round() / 100.0
}

/// Result of a conversion request; only the requested directions are filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversion {
    pub drops_per_ml: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drops_from_ml: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drops: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_from_drops: Option<f64>,
}

pub fn convert(ml: Option<f64>, drops: Option<f64>) -> Conversion {
    Conversion {
        drops_per_ml: DROPS_PER_ML,
        ml,
        drops_from_ml: ml.map(ml_to_drops),
        drops,
        ml_from_drops: drops.map(drops_to_ml),
    }
}
