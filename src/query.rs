use chrono::NaiveDate;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use typed_builder::TypedBuilder;
use url::Url;

use crate::schema::{AccountName, LabNumber};

pub const RESULTS_PATH: &str = "soils/aspx/results.aspx";
pub const PUBLIC_USER_NAME: &str = "AGSRVLB";

/// A search on the results page.
#[derive(Clone, PartialEq, Eq, Debug, TypedBuilder, Getters, CopyGetters)]
pub struct ResultsQuery {
    #[builder(default)]
    #[getset(get_copy = "pub")]
    lab_num_a: Option<LabNumber>,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    lab_num_b: Option<LabNumber>,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    date_a: Option<NaiveDate>,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    date_b: Option<NaiveDate>,
    #[builder(default)]
    #[getset(get = "pub")]
    name: Option<AccountName>,
    #[builder(default = PUBLIC_USER_NAME.to_owned())]
    #[getset(get = "pub")]
    user_name: String,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    admin_auth: u8,
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum QueryError {
    #[error("Lab number range is reversed: {0} > {1}")]
    ReversedLabNumbers(LabNumber, LabNumber),
    #[error("Date range is reversed: {0} > {1}")]
    ReversedDates(NaiveDate, NaiveDate),
    #[error("At least one of lab number range, date range, or name must be given")]
    Unbounded,
}

// Field order is the order of the parameters in the URL.
#[derive(Serialize)]
struct QueryForm<'a> {
    qs: u8,
    #[serde(rename = "LabNumA")]
    lab_num_a: String,
    #[serde(rename = "LabNumB")]
    lab_num_b: String,
    #[serde(rename = "DateA")]
    date_a: String,
    #[serde(rename = "DateB")]
    date_b: String,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "UserName")]
    user_name: &'a str,
    #[serde(rename = "AdminAuth")]
    admin_auth: u8,
    submit: &'a str,
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(String::new, |d| d.format("%m/%d/%Y").to_string())
}

impl ResultsQuery {
    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(a), Some(b)) = (self.lab_num_a, self.lab_num_b) {
            if a > b {
                return Err(QueryError::ReversedLabNumbers(a, b));
            }
        }
        if let (Some(a), Some(b)) = (self.date_a, self.date_b) {
            if a > b {
                return Err(QueryError::ReversedDates(a, b));
            }
        }
        let has_lab_nums = self.lab_num_a.is_some() || self.lab_num_b.is_some();
        let has_dates = self.date_a.is_some() || self.date_b.is_some();
        let has_name = self
            .name
            .as_ref()
            .is_some_and(|x| !AsRef::<str>::as_ref(x).is_empty());
        if !(has_lab_nums || has_dates || has_name) {
            return Err(QueryError::Unbounded);
        }
        Ok(())
    }

    pub fn to_url(&self, base: &Url) -> anyhow::Result<Url> {
        let form = QueryForm {
            qs: 1,
            lab_num_a: self.lab_num_a.map_or_else(String::new, |x| x.to_string()),
            lab_num_b: self.lab_num_b.map_or_else(String::new, |x| x.to_string()),
            date_a: format_date(self.date_a),
            date_b: format_date(self.date_b),
            name: self.name.as_ref().map_or("", AsRef::<str>::as_ref),
            user_name: &self.user_name,
            admin_auth: self.admin_auth,
            submit: "SEARCH",
        };
        let mut url = base.join(RESULTS_PATH)?;
        url.set_query(Some(&serde_html_form::to_string(&form)?));
        Ok(url)
    }

    /// Splits the lab number range into consecutive queries covering at most
    /// `page_size` lab numbers each.  `0` means no splitting.
    pub fn pages(&self, page_size: u32) -> Vec<ResultsQuery> {
        let (Some(a), Some(b)) = (self.lab_num_a, self.lab_num_b) else {
            return vec![self.clone()];
        };
        if page_size == 0 || a > b {
            return vec![self.clone()];
        }
        let (a, b) = (u64::from(a.get()), u64::from(b.get()));
        (a..=b)
            .step_by(page_size as usize)
            .map(|start| {
                let end = (start + u64::from(page_size) - 1).min(b);
                ResultsQuery {
                    lab_num_a: Some(LabNumber::from(start as u32)),
                    lab_num_b: Some(LabNumber::from(end as u32)),
                    ..self.clone()
                }
            })
            .collect_vec()
    }
}
