use std::collections::HashSet;

use log::{info, warn};
use tokio::time::sleep;

use crate::{
    api::LabClient,
    config::Config,
    crop::CropType,
    lime::{self, LimeRecommendation},
    parser::report::Report,
    query::ResultsQuery,
    schema::{PhValue, ResultsRow, SampleRecord},
};

/// Collects one record per sample matching `query`, in the order of the results pages.
///
/// A sample whose report cannot be retrieved is still returned, without report values.
/// A results page that cannot be retrieved is skipped; it is an error only if no page
/// could be retrieved at all.
pub async fn collect(
    client: &LabClient,
    query: &ResultsQuery,
    config: &Config,
) -> anyhow::Result<Vec<SampleRecord>> {
    query.validate()?;
    let interval = config.request_interval()?;
    let pages = query.pages(config.page_size);
    let num_pages = pages.len();
    let mut records = vec![];
    let mut seen = HashSet::new();
    let mut first_request = true;
    let mut loaded_pages = 0;
    let mut last_error = None;
    for (page_index, page_query) in pages.iter().enumerate() {
        let page = match client.fetch_results(page_query).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    "Failed to retrieve results page {}/{num_pages}: {e:#}",
                    page_index + 1
                );
                last_error = Some(e);
                continue;
            }
        };
        loaded_pages += 1;
        let total = page.rows().len();
        for (i, row) in page.rows().iter().enumerate() {
            let lab = row.lab_number();
            if !seen.insert(lab) {
                warn!("Lab {lab} is listed more than once.  Keeping the first one.");
                continue;
            }
            if !first_request {
                sleep(interval).await;
            }
            first_request = false;
            info!("Fetching report for lab {lab} ({}/{total})", i + 1);
            let record = match client.fetch_report(&page, row).await {
                Ok(report) => make_record(row.clone(), report, config),
                Err(e) => {
                    warn!("Failed to retrieve report for lab {lab}: {e:#}");
                    SampleRecord::without_report(row.clone())
                }
            };
            records.push(record);
        }
    }
    if let (0, Some(e)) = (loaded_pages, last_error) {
        return Err(e.context("No results page could be retrieved"));
    }
    if loaded_pages < num_pages {
        warn!(
            "{} of {num_pages} results pages could not be retrieved.",
            num_pages - loaded_pages
        );
    }
    info!("Collected {} samples.", records.len());
    Ok(records)
}

pub fn make_record(row: ResultsRow, report: Report, config: &Config) -> SampleRecord {
    let analysis = report.analysis().clone();
    let soil_ph = row.soil_ph().or(analysis.soil_ph());
    let buffer_ph = row.buffer_ph().or(analysis.buffer_ph());
    let crop = report.crop();
    let computed_lime = recompute_lime(crop, soil_ph, buffer_ph, config);
    SampleRecord::new(row, crop, report.lab_lime().clone(), computed_lime, analysis)
}

/// The lime recommendation recomputed from the crop's target pH.
pub fn recompute_lime(
    crop: Option<CropType>,
    soil_ph: Option<PhValue>,
    buffer_ph: Option<PhValue>,
    config: &Config,
) -> LimeRecommendation {
    match (crop, soil_ph, buffer_ph) {
        (Some(crop), Some(soil_ph), Some(buffer_ph)) => {
            lime::compute(soil_ph, buffer_ph, config.target_ph(crop), &config.lime)
        }
        _ => LimeRecommendation::NotFound,
    }
}
