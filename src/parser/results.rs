use anyhow::Context;
use itertools::Itertools;
use log::{debug, warn};
use scraper::{ElementRef, Html};
use soil_report_utils::selector;
use thiserror::Error;
use url::Url;

use crate::schema::{LabNumber, PhValue, ResultsRow};

pub const NAME: &str = "Name";
pub const DATE_SAMPLED: &str = "Date Sampled";
pub const SAMPLE_NO: &str = "Sample No";
pub const LAB_NUM: &str = "LabNum";
pub const SOIL_PH: &str = "Soil pH";
pub const BUFFER_PH: &str = "Buffer pH";

#[derive(PartialEq, Eq, Debug, Error)]
pub enum ResultsError {
    #[error("No results table found")]
    NoTable,
    #[error("Unexpected table format: column {0:?} not found")]
    MissingColumn(&'static str),
}

/// Whether the results page has finished loading.
pub fn is_results_page(text: &str) -> bool {
    text.contains(LAB_NUM)
}

struct Columns {
    name: usize,
    date: usize,
    sample: usize,
    lab: usize,
    soil_ph: usize,
    buffer_ph: usize,
}
impl Columns {
    fn find(headers: &[String]) -> Result<Self, ResultsError> {
        let index = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(ResultsError::MissingColumn(name))
        };
        Ok(Self {
            name: index(NAME)?,
            date: index(DATE_SAMPLED)?,
            sample: index(SAMPLE_NO)?,
            lab: index(LAB_NUM)?,
            soil_ph: index(SOIL_PH)?,
            buffer_ph: index(BUFFER_PH)?,
        })
    }

    fn max(&self) -> usize {
        [
            self.name,
            self.date,
            self.sample,
            self.lab,
            self.soil_ph,
            self.buffer_ph,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_owned()
}

fn parse_ph(text: &str, lab: &str, column: &str) -> Option<PhValue> {
    if text.is_empty() {
        return None;
    }
    text.parse::<PhValue>()
        .map_err(|e| warn!("Lab {lab}: ignoring {column} {text:?}: {e}"))
        .ok()
}

/// Parses the results table.  Relative report links are resolved against `page_url`.
pub fn parse(html: &Html, page_url: &Url) -> anyhow::Result<Vec<ResultsRow>> {
    let table = html
        .select(selector!("table"))
        .find(|table| table.select(selector!("th")).next().is_some())
        .ok_or(ResultsError::NoTable)?;
    let headers = table.select(selector!("th")).map(cell_text).collect_vec();
    debug!("Results table headers: {headers:?}");
    let columns = Columns::find(&headers)?;

    let mut rows = vec![];
    for tr in table.select(selector!("tr")) {
        let cells = tr.select(selector!("td")).collect_vec();
        if cells.is_empty() {
            continue;
        }
        if cells.len() <= columns.max() {
            warn!(
                "Skipping a row with {} cells: {:?}",
                cells.len(),
                cells.iter().copied().map(cell_text).collect_vec()
            );
            continue;
        }
        let lab_text = cell_text(cells[columns.lab]);
        let lab_number = match lab_text.parse::<LabNumber>() {
            Ok(lab_number) => lab_number,
            Err(e) => {
                warn!("Skipping a row with lab number {lab_text:?}: {e}");
                continue;
            }
        };
        let report_url = cells[columns.lab]
            .select(selector!("a"))
            .next()
            .and_then(|a| a.attr("href"))
            .map(|href| page_url.join(href.trim()))
            .transpose()
            .with_context(|| format!("Invalid report link for lab {lab_text}"))?;
        let row = ResultsRow::builder()
            .account(cell_text(cells[columns.name]).into())
            .date_sampled(cell_text(cells[columns.date]).into())
            .sample_no(cell_text(cells[columns.sample]).into())
            .lab_number(lab_number)
            .soil_ph(parse_ph(
                &cell_text(cells[columns.soil_ph]),
                &lab_text,
                SOIL_PH,
            ))
            .buffer_ph(parse_ph(
                &cell_text(cells[columns.buffer_ph]),
                &lab_text,
                BUFFER_PH,
            ))
            .report_url(report_url)
            .build();
        rows.push(row);
    }
    Ok(rows)
}

/// Looks up the report link for `lab` on a freshly fetched results page.
pub fn find_report_link(html: &Html, page_url: &Url, lab: &str) -> anyhow::Result<Option<Url>> {
    html.select(selector!("a"))
        .find(|a| a.text().collect::<String>().trim() == lab)
        .and_then(|a| a.attr("href"))
        .map(|href| page_url.join(href.trim()))
        .transpose()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use scraper::Html;
    use url::Url;

    use super::{find_report_link, is_results_page, parse, ResultsError};
    use crate::schema::LabNumber;

    const RESULTS: &str = r#"
<html><body>
<form><table><tr><td>Search</td></tr></table></form>
<table>
  <tr><th>Name</th><th>Date Sampled</th><th>Sample No</th><th> LabNum </th><th>Soil pH</th><th>Buffer pH</th></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>1</td>
      <td><a href="report.aspx?key=abc&amp;lab=25050901">25050901</a></td><td>5.4</td><td>7.70</td></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>2</td>
      <td><a href="/soils/aspx/report.aspx?key=abc&amp;lab=25050902">25050902</a></td><td></td><td>n/a</td></tr>
  <tr><td colspan="6">Page 1 of 1</td></tr>
</table>
</body></html>"#;

    fn page_url() -> Url {
        Url::parse("https://psaweb.clemson.edu/soils/aspx/results.aspx?qs=1").unwrap()
    }

    #[test]
    fn parse_rows() {
        let rows = parse(&Html::parse_document(RESULTS), &page_url()).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.account().to_string(), "SMITH FARM");
        assert_eq!(first.date_sampled().to_string(), "05/09/2025");
        assert_eq!(first.sample_no().to_string(), "1");
        assert_eq!(first.lab_number(), LabNumber::from(25050901));
        assert_eq!(first.soil_ph().map(|x| x.get()), Some(5.4));
        assert_eq!(first.buffer_ph().map(|x| x.get()), Some(7.7));
        assert_eq!(
            first.report_url().as_ref().map(Url::as_str),
            Some("https://psaweb.clemson.edu/soils/aspx/report.aspx?key=abc&lab=25050901")
        );

        let second = &rows[1];
        assert_eq!(second.soil_ph(), None);
        assert_eq!(second.buffer_ph(), None);
        assert_eq!(
            second.report_url().as_ref().map(Url::as_str),
            Some("https://psaweb.clemson.edu/soils/aspx/report.aspx?key=abc&lab=25050902")
        );
    }

    #[test]
    fn skip_rows_without_lab_number() {
        let html = Html::parse_document(
            r#"<table>
  <tr><th>Name</th><th>Date Sampled</th><th>Sample No</th><th>LabNum</th><th>Soil pH</th><th>Buffer pH</th></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>1</td><td>25050901</td><td>5.4</td><td>7.70</td></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>2</td><td>Pending</td><td></td><td></td></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>3</td><td></td><td></td><td></td></tr>
  <tr><td>SMITH FARM</td><td>05/09/2025</td><td>4</td><td>25050904</td><td>6.0</td><td>7.90</td></tr>
</table>"#,
        );
        let rows = parse(&html, &page_url()).unwrap();
        let labs = rows.iter().map(|row| row.lab_number()).collect::<Vec<_>>();
        assert_eq!(labs, [LabNumber::from(25050901), LabNumber::from(25050904)]);
    }

    #[test]
    fn missing_table() {
        let html = Html::parse_document("<html><body><p>No records</p></body></html>");
        let err = parse(&html, &page_url()).unwrap_err();
        assert_eq!(err.downcast_ref::<ResultsError>(), Some(&ResultsError::NoTable));
    }

    #[test]
    fn missing_column() {
        let html = Html::parse_document(
            "<table><tr><th>Name</th><th>LabNum</th></tr><tr><td>a</td><td>1</td></tr></table>",
        );
        let err = parse(&html, &page_url()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResultsError>(),
            Some(&ResultsError::MissingColumn("Date Sampled"))
        );
    }

    #[test]
    fn loaded_page() {
        assert!(is_results_page(RESULTS));
        assert!(!is_results_page("<html>Loading...</html>"));
    }

    #[test]
    fn relink() {
        let html = Html::parse_document(RESULTS);
        let url = find_report_link(&html, &page_url(), "25050902").unwrap();
        assert_eq!(
            url.as_ref().map(Url::as_str),
            Some("https://psaweb.clemson.edu/soils/aspx/report.aspx?key=abc&lab=25050902")
        );
        assert_eq!(find_report_link(&html, &page_url(), "1").unwrap(), None);
    }
}
