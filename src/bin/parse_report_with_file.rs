use std::path::PathBuf;

use clap::Parser;
use scraper::Html;
use soil_report_scraping::{
    config::{Config, DEFAULT_CONFIG_PATH},
    data_collector::recompute_lime,
    parser::report::{self, Nutrient},
    schema::PhValue,
};
use strum::IntoEnumIterator;

#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
    /// Soil pH, when the report does not print it
    #[arg(long)]
    soil_ph: Option<PhValue>,
    /// Buffer pH, when the report does not print it
    #[arg(long)]
    buffer_ph: Option<PhValue>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,
    /// Dump the parsed report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let config = Config::load(&opts.config_path)?;
    let html = Html::parse_document(&fs_err::read_to_string(&opts.input_file)?);
    let report = report::parse(&html)?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let analysis = report.analysis();
    let soil_ph = analysis.soil_ph().or(opts.soil_ph);
    let buffer_ph = analysis.buffer_ph().or(opts.buffer_ph);
    match report.crop() {
        Some(crop) => println!("crop = {crop} ({})", crop.lab_code()),
        None => println!("crop = N/A"),
    }
    println!("lab lime = {}", report.lab_lime());
    println!(
        "computed lime = {}",
        recompute_lime(report.crop(), soil_ph, buffer_ph, &config)
    );
    println!("soil pH = {soil_ph:?}, buffer pH = {buffer_ph:?}");
    for nutrient in Nutrient::iter() {
        if let Some(value) = analysis.nutrient(nutrient) {
            println!("    {:<16} {value}", nutrient.column());
        }
    }
    Ok(())
}
