use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use log::info;
use soil_report_scraping::{
    api::LabClient,
    config::{Config, DEFAULT_CONFIG_PATH},
    data_collector::collect,
    export::write_csv_file,
    query::ResultsQuery,
    schema::{AccountName, LabNumber},
};
use soil_report_utils::fs_json_util::write_json;

#[derive(Parser)]
struct Opts {
    /// First lab number of the range
    #[arg(long)]
    lab_from: Option<LabNumber>,
    /// Last lab number of the range (inclusive)
    #[arg(long)]
    lab_to: Option<LabNumber>,
    /// First sampling date, YYYY-MM-DD
    #[arg(long)]
    date_from: Option<NaiveDate>,
    /// Last sampling date, YYYY-MM-DD
    #[arg(long)]
    date_to: Option<NaiveDate>,
    /// Account name to search for
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,
    #[arg(long, short, default_value = "soil_reports.csv")]
    output: PathBuf,
    /// Also save the records as JSON
    #[arg(long)]
    json: Option<PathBuf>,
    /// Lab numbers per results page; overrides the config
    #[arg(long)]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let mut config = Config::load(&opts.config_path)?;
    if let Some(page_size) = opts.page_size {
        config.page_size = page_size;
    }

    let query = ResultsQuery::builder()
        .lab_num_a(opts.lab_from)
        .lab_num_b(opts.lab_to.or(opts.lab_from))
        .date_a(opts.date_from)
        .date_b(opts.date_to)
        .name(opts.name.map(AccountName::from))
        .user_name(config.user_name.clone())
        .admin_auth(config.admin_auth)
        .build();
    query.validate()?;

    let client = LabClient::new(&config)?;
    let records = collect(&client, &query, &config).await?;

    write_csv_file(&opts.output, &records)?;
    info!("Saved {} records to {:?}.", records.len(), opts.output);
    if let Some(path) = &opts.json {
        write_json(path, &records)?;
        info!("Saved {} records to {path:?}.", records.len());
    }
    Ok(())
}
