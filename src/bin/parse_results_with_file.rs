use std::path::PathBuf;

use clap::Parser;
use scraper::Html;
use soil_report_scraping::{config::DEFAULT_BASE_URL, parser::results, query::RESULTS_PATH};
use url::Url;

#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
    /// URL the page was saved from, used to resolve report links
    #[arg(long)]
    page_url: Option<Url>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let page_url = match opts.page_url {
        Some(url) => url,
        None => Url::parse(DEFAULT_BASE_URL)?.join(RESULTS_PATH)?,
    };
    let html = Html::parse_document(&fs_err::read_to_string(&opts.input_file)?);
    let rows = results::parse(&html, &page_url)?;
    println!("{} rows", rows.len());
    for row in &rows {
        println!("    {row:?}");
    }
    Ok(())
}
