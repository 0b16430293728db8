use std::{fmt::Debug, io, path::PathBuf};

use anyhow::Context;
use fs_err::File;
use itertools::{chain, Itertools};
use strum::IntoEnumIterator;

use crate::{parser::report::Nutrient, schema::SampleRecord};

pub const NOT_AVAILABLE: &str = "N/A";

const LEADING_COLUMNS: [&str; 9] = [
    "Account",
    "Sample No",
    "Lab #",
    "Date",
    "Soil pH",
    "Buffer pH",
    "Crop",
    "Lime (lbs/1000ft²)",
    "Computed Lime (lbs/1000ft²)",
];
const REPORT_URL_COLUMN: &str = "Report URL";

pub fn header() -> Vec<&'static str> {
    chain!(
        LEADING_COLUMNS,
        Nutrient::iter().map(Nutrient::column),
        [REPORT_URL_COLUMN]
    )
    .collect()
}

fn format_number(value: Option<f64>) -> String {
    value.map_or_else(String::new, |x| x.to_string())
}

pub fn to_row(record: &SampleRecord) -> Vec<String> {
    let row = record.row();
    let leading = [
        row.account().to_string(),
        row.sample_no().to_string(),
        row.lab_number().to_string(),
        row.date_sampled().to_string(),
        format_number(record.soil_ph().map(|x| x.get())),
        format_number(record.buffer_ph().map(|x| x.get())),
        record
            .crop()
            .map_or_else(|| NOT_AVAILABLE.to_owned(), |x| x.label().to_owned()),
        record.lab_lime().export_per_thousand_sq_ft(),
        record.computed_lime().export_per_thousand_sq_ft(),
    ];
    let nutrients = Nutrient::iter().map(|n| format_number(record.analysis().nutrient(n)));
    let url = row
        .report_url()
        .as_ref()
        .map_or_else(String::new, |x| x.to_string());
    chain!(leading, nutrients, [url]).collect_vec()
}

pub fn write_csv<W: io::Write>(writer: W, records: &[SampleRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(header())?;
    for record in records {
        writer.write_record(to_row(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv_file<P: Into<PathBuf> + Debug>(
    path: P,
    records: &[SampleRecord],
) -> anyhow::Result<()> {
    let path = path.into();
    (|| write_csv(io::BufWriter::new(File::create(&path)?), records))()
        .with_context(|| format!("While writing CSV to {path:?}"))
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{header, write_csv};
    use crate::{
        crop::CropType,
        lime::{LimeAmount, LimeRecommendation},
        parser::report::SoilAnalysis,
        schema::{LabNumber, PhValue, ResultsRow, SampleRecord},
    };

    fn row(lab: u32) -> ResultsRow {
        ResultsRow::builder()
            .account("SMITH FARM".to_owned().into())
            .date_sampled("05/09/2025".to_owned().into())
            .sample_no("Front, yard".to_owned().into())
            .lab_number(LabNumber::from(lab))
            .soil_ph(Some(PhValue::try_from(5.4).unwrap()))
            .buffer_ph(None)
            .report_url(Some(
                Url::parse("https://psaweb.clemson.edu/soils/aspx/report.aspx?lab=1").unwrap(),
            ))
            .build()
    }

    #[test]
    fn header_columns() {
        let header = header();
        assert_eq!(header.len(), 22);
        assert_eq!(header[0], "Account");
        assert_eq!(header[7], "Lime (lbs/1000ft²)");
        assert_eq!(header[9], "P");
        assert_eq!(header[21], "Report URL");
    }

    #[test]
    fn write_records() {
        let records = [
            SampleRecord::new(
                row(25050901),
                Some(CropType::WarmSeason),
                LimeRecommendation::PerThousandSqFt(LimeAmount::from_printed("25.0").unwrap()),
                LimeRecommendation::NotNeeded,
                SoilAnalysis::default(),
            ),
            SampleRecord::without_report(row(25050902)),
        ];
        let mut buf = vec![];
        write_csv(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Account,Sample No,Lab #,Date,Soil pH,Buffer pH,Crop,"));
        assert_eq!(
            lines[1],
            r#"SMITH FARM,"Front, yard",25050901,05/09/2025,5.4,,Warm-Season,25.0,None,,,,,,,,,,,,,https://psaweb.clemson.edu/soils/aspx/report.aspx?lab=1"#
        );
        assert!(lines[2].contains(",N/A,None,None,"));
    }
}
