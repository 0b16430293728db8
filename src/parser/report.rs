use std::collections::BTreeMap;

use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::{debug, trace};
use ::regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use soil_report_utils::{regex, selector};
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::{
    crop::CropType,
    lime::{LimeAmount, LimeRecommendation},
    schema::PhValue,
};

#[derive(PartialEq, Eq, Debug, Error)]
pub enum ReportError {
    #[error("The results session has expired (Page Timeout)")]
    SessionTimeout,
}

#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Report {
    #[getset(get_copy = "pub")]
    crop: Option<CropType>,
    #[getset(get = "pub")]
    lab_lime: LimeRecommendation,
    #[getset(get = "pub")]
    analysis: SoilAnalysis,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumIter, Serialize, Deserialize,
)]
pub enum Nutrient {
    P,
    K,
    Ca,
    Mg,
    Zn,
    Mn,
    Cu,
    B,
    Na,
    Cec,
    BaseSaturation,
    OrganicMatter,
}
impl Nutrient {
    /// Column name in exported tables.
    pub fn column(self) -> &'static str {
        use Nutrient::*;
        match self {
            P => "P",
            K => "K",
            Ca => "Ca",
            Mg => "Mg",
            Zn => "Zn",
            Mn => "Mn",
            Cu => "Cu",
            B => "B",
            Na => "Na",
            Cec => "CEC",
            BaseSaturation => "Base Saturation",
            OrganicMatter => "Organic Matter",
        }
    }

    fn labels(self) -> &'static [&'static str] {
        use Nutrient::*;
        match self {
            P => &["P", "Phosphorus"],
            K => &["K", "Potassium"],
            Ca => &["Ca", "Calcium"],
            Mg => &["Mg", "Magnesium"],
            Zn => &["Zn", "Zinc"],
            Mn => &["Mn", "Manganese"],
            Cu => &["Cu", "Copper"],
            B => &["B", "Boron"],
            Na => &["Na", "Sodium"],
            Cec => &["CEC", "Cation Exchange Capacity"],
            BaseSaturation => &["Base Saturation", "% Base Saturation", "BS"],
            OrganicMatter => &["Organic Matter", "OM"],
        }
    }
}

const SOIL_PH_LABELS: &[&str] = &["Soil pH", "Water pH"];
const BUFFER_PH_LABELS: &[&str] = &["Buffer pH"];

/// Values from the chemical analysis part of a report.
#[derive(Clone, Default, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct SoilAnalysis {
    #[getset(get_copy = "pub")]
    soil_ph: Option<PhValue>,
    #[getset(get_copy = "pub")]
    buffer_ph: Option<PhValue>,
    #[getset(get = "pub")]
    nutrients: BTreeMap<Nutrient, f64>,
}
impl SoilAnalysis {
    pub fn nutrient(&self, nutrient: Nutrient) -> Option<f64> {
        self.nutrients.get(&nutrient).copied()
    }
}

/// All text nodes of the document joined by single spaces.
pub fn flatten_text(html: &Html) -> String {
    html.root_element()
        .text()
        .flat_map(str::split_whitespace)
        .join(" ")
}

pub fn is_session_timeout(text: &str) -> bool {
    text.contains("Page Timeout") || text.contains("REFRESH your Results page")
}

/// Finds the crop type in the text of a report (the "crop screen").
pub fn screen_crop(text: &str) -> Option<CropType> {
    CropType::screen(text)
}

pub fn parse(html: &Html) -> Result<Report, ReportError> {
    let text = flatten_text(html);
    trace!("Report text: {text}");
    if is_session_timeout(&text) {
        return Err(ReportError::SessionTimeout);
    }
    Ok(Report {
        crop: screen_crop(&text),
        lab_lime: parse_lab_lime(&text),
        analysis: parse_analysis(html, &text),
    })
}

/// The lime recommendation, exactly as the lab printed it.
pub fn parse_lab_lime(text: &str) -> LimeRecommendation {
    let per_thousand = regex!(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*lbs?\s*/\s*1000");
    let per_acre = regex!(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*lbs?\s*/\s*(?:A|[Aa]cre)\b");
    if let Some(amount) = first_amount(per_thousand, text) {
        LimeRecommendation::PerThousandSqFt(amount)
    } else if let Some(amount) = first_amount(per_acre, text) {
        LimeRecommendation::PerAcre(amount)
    } else if text.to_lowercase().contains("no lime") {
        LimeRecommendation::NotNeeded
    } else {
        LimeRecommendation::NotFound
    }
}

fn first_amount(pattern: &Regex, text: &str) -> Option<LimeAmount> {
    pattern
        .captures_iter(text)
        .find_map(|caps| LimeAmount::from_printed(&caps[1]))
}

fn parse_analysis(html: &Html, text: &str) -> SoilAnalysis {
    let find_ph = |labels: &[&str]| {
        find_labeled_value(html, text, labels).and_then(|x| PhValue::try_from(x).ok())
    };
    let nutrients = Nutrient::iter()
        .filter_map(|nutrient| {
            find_labeled_value(html, text, nutrient.labels()).map(|value| (nutrient, value))
        })
        .collect();
    SoilAnalysis {
        soil_ph: find_ph(SOIL_PH_LABELS),
        buffer_ph: find_ph(BUFFER_PH_LABELS),
        nutrients,
    }
}

/// Finds the number labeled by one of `labels`.
/// Table cells are searched first; the flattened text is the fallback.
pub fn find_labeled_value(html: &Html, text: &str, labels: &[&str]) -> Option<f64> {
    labels
        .iter()
        .find_map(|label| find_in_table(html, label))
        .or_else(|| labels.iter().find_map(|label| find_in_text(text, label)))
}

fn first_number(s: &str) -> Option<f64> {
    regex!(r"[0-9]+(?:\.[0-9]+)?")
        .find(s)
        .and_then(|m| m.as_str().parse().ok())
}

fn is_label_cell(cell: ElementRef, label: &str) -> bool {
    let text = cell.text().collect::<String>();
    let text = text.trim();
    let text = text.strip_suffix(':').unwrap_or(text).trim_end();
    text.eq_ignore_ascii_case(label)
}

fn find_in_table(html: &Html, label: &str) -> Option<f64> {
    html.select(selector!("td, th"))
        .filter(|&cell| is_label_cell(cell, label))
        .find_map(|cell| {
            // Label and value side by side, or label above value.
            let res = value_right_of(cell).or_else(|| value_below(cell));
            debug!("Label {label:?} in table: {res:?}");
            res
        })
}

fn value_right_of(cell: ElementRef) -> Option<f64> {
    let next = cell.next_siblings().find_map(ElementRef::wrap)?;
    first_number(&next.text().collect::<String>())
}

fn value_below(cell: ElementRef) -> Option<f64> {
    let row = cell.parent().and_then(ElementRef::wrap)?;
    let column = row
        .children()
        .filter_map(ElementRef::wrap)
        .position(|x| x.id() == cell.id())?;
    let next_row = row.next_siblings().find_map(ElementRef::wrap)?;
    let below = next_row
        .children()
        .filter_map(ElementRef::wrap)
        .nth(column)?;
    first_number(&below.text().collect::<String>())
}

fn find_in_text(text: &str, label: &str) -> Option<f64> {
    let pattern = format!(
        r"(?:^|[^A-Za-z0-9]){}\s*:?\s*([0-9]+(?:\.[0-9]+)?)",
        ::regex::escape(label)
    );
    let pattern = Regex::new(&pattern).ok()?;
    pattern
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
