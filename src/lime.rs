use std::fmt::Display;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::schema::PhValue;

pub const SQ_FT_PER_ACRE: f64 = 43_560.0;

/// An amount of lime, keeping the text the lab printed for it.
#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct LimeAmount {
    #[getset(get = "pub")]
    printed: String,
    #[getset(get_copy = "pub")]
    value: f64,
}
impl LimeAmount {
    /// Returns `None` if `printed` is not a number.  Thousands separators are allowed.
    pub fn from_printed(printed: impl Into<String>) -> Option<Self> {
        let printed = printed.into();
        let value = printed.trim().replace(',', "").parse().ok()?;
        Some(Self { printed, value })
    }

    pub fn from_value(value: f64, decimals: usize) -> Self {
        Self {
            printed: format!("{value:.decimals$}"),
            value,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum LimeRecommendation {
    PerThousandSqFt(LimeAmount),
    PerAcre(LimeAmount),
    NotNeeded,
    NotFound,
}
impl LimeRecommendation {
    /// Pounds per 1000 sq ft, with `0` when no lime is needed.
    pub fn per_thousand_sq_ft(&self) -> Option<f64> {
        match self {
            Self::PerThousandSqFt(amount) => Some(amount.value()),
            Self::PerAcre(amount) => Some(amount.value() * 1000.0 / SQ_FT_PER_ACRE),
            Self::NotNeeded => Some(0.0),
            Self::NotFound => None,
        }
    }

    /// The value for the "lbs/1000ft²" column.
    /// Per-1000 amounts are kept exactly as printed.
    pub fn export_per_thousand_sq_ft(&self) -> String {
        match self {
            Self::PerThousandSqFt(amount) => amount.printed().trim().to_owned(),
            Self::PerAcre(amount) => {
                format!("{:.1}", amount.value() * 1000.0 / SQ_FT_PER_ACRE)
            }
            Self::NotNeeded | Self::NotFound => "None".to_owned(),
        }
    }
}
impl Display for LimeRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerThousandSqFt(amount) => write!(f, "{} lb/1000 sq ft", amount.printed()),
            Self::PerAcre(amount) => write!(f, "{} lb/acre", amount.printed()),
            Self::NotNeeded => write!(f, "no lime needed"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

/// Constants of the buffer-pH lime requirement equation.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LimeParams {
    /// Buffer pH of a soil that needs no lime.
    pub buffer_reference: f64,
    /// Pounds of lime per acre per pH unit per buffer pH unit.
    pub factor: f64,
    /// Per-acre amounts are rounded to a multiple of this.
    pub rounding_lbs_per_acre: f64,
}
impl Default for LimeParams {
    fn default() -> Self {
        Self {
            buffer_reference: 8.0,
            factor: 6000.0,
            rounding_lbs_per_acre: 100.0,
        }
    }
}

/// Lime needed to raise `soil_ph` to `target_ph`, reported per 1000 sq ft.
///
/// `lbs/acre = (target - soil) * (buffer_reference - buffer) * factor`
pub fn compute(
    soil_ph: PhValue,
    buffer_ph: PhValue,
    target_ph: f64,
    params: &LimeParams,
) -> LimeRecommendation {
    let (soil_ph, buffer_ph) = (soil_ph.get(), buffer_ph.get());
    if soil_ph >= target_ph {
        return LimeRecommendation::NotNeeded;
    }
    let per_acre = (target_ph - soil_ph) * (params.buffer_reference - buffer_ph) * params.factor;
    let per_acre = if params.rounding_lbs_per_acre > 0.0 {
        (per_acre / params.rounding_lbs_per_acre).round() * params.rounding_lbs_per_acre
    } else {
        per_acre
    };
    if per_acre <= 0.0 {
        return LimeRecommendation::NotNeeded;
    }
    let per_thousand = per_acre * 1000.0 / SQ_FT_PER_ACRE;
    LimeRecommendation::PerThousandSqFt(LimeAmount::from_value(per_thousand, 1))
}
