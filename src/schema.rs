use std::{num::ParseIntError, str::FromStr};

use derive_more::{AsRef, Display, From};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    crop::CropType,
    lime::LimeRecommendation,
    parser::report::SoilAnalysis,
};

/// The lab's sample identifier, e.g. `25050901`.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, From, Serialize, Deserialize,
)]
pub struct LabNumber(u32);
impl LabNumber {
    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum LabNumberParseError {
    #[error("Lab number is empty")]
    Empty,
    #[error("Lab number must consist of digits: {0:?}")]
    NotDigits(String),
    #[error("Lab number is out of range: {0}")]
    ParseIntError(#[from] ParseIntError),
}
impl FromStr for LabNumber {
    type Err = LabNumberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LabNumberParseError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LabNumberParseError::NotDigits(s.to_owned()));
        }
        Ok(Self(s.parse()?))
    }
}

#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct AccountName(String);

#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct SampleNo(String);

/// Date sampled, kept exactly as the results table prints it.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct SampleDate(String);

#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct PhValue(f64);
impl PhValue {
    pub fn get(self) -> f64 {
        self.0
    }
}
impl TryFrom<f64> for PhValue {
    type Error = PhParseError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=14.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PhParseError::OutOfRange(value))
        }
    }
}
impl FromStr for PhValue {
    type Err = PhParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value: f64 = s.parse().map_err(|_| PhParseError::Invalid(s.to_owned()))?;
        value.try_into()
    }
}
impl std::fmt::Display for PhValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(PartialEq, Debug, Error)]
pub enum PhParseError {
    #[error("pH value is not a number: {0:?}")]
    Invalid(String),
    #[error("pH value is out of range: {0}")]
    OutOfRange(f64),
}

/// One row of the results listing.
#[derive(Clone, PartialEq, Debug, TypedBuilder, Getters, CopyGetters, Serialize, Deserialize)]
pub struct ResultsRow {
    #[getset(get = "pub")]
    account: AccountName,
    #[getset(get = "pub")]
    date_sampled: SampleDate,
    #[getset(get = "pub")]
    sample_no: SampleNo,
    #[getset(get_copy = "pub")]
    lab_number: LabNumber,
    #[getset(get_copy = "pub")]
    soil_ph: Option<PhValue>,
    #[getset(get_copy = "pub")]
    buffer_ph: Option<PhValue>,
    #[getset(get = "pub")]
    report_url: Option<Url>,
}

/// Everything known about a single lab sample.  Exactly one per [`ResultsRow`].
#[derive(Clone, PartialEq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct SampleRecord {
    row: ResultsRow,
    crop: Option<CropType>,
    lab_lime: LimeRecommendation,
    computed_lime: LimeRecommendation,
    analysis: SoilAnalysis,
}
impl SampleRecord {
    /// A record whose report could not be retrieved.
    pub fn without_report(row: ResultsRow) -> Self {
        Self {
            row,
            crop: None,
            lab_lime: LimeRecommendation::NotFound,
            computed_lime: LimeRecommendation::NotFound,
            analysis: SoilAnalysis::default(),
        }
    }

    pub fn new(
        row: ResultsRow,
        crop: Option<CropType>,
        lab_lime: LimeRecommendation,
        computed_lime: LimeRecommendation,
        analysis: SoilAnalysis,
    ) -> Self {
        Self {
            row,
            crop,
            lab_lime,
            computed_lime,
            analysis,
        }
    }

    /// Soil pH from the results table, or from the report when the table cell was blank.
    pub fn soil_ph(&self) -> Option<PhValue> {
        self.row.soil_ph().or(self.analysis.soil_ph())
    }

    pub fn buffer_ph(&self) -> Option<PhValue> {
        self.row.buffer_ph().or(self.analysis.buffer_ph())
    }
}
