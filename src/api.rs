use std::time::Duration;

use anyhow::{bail, Context};
use getset::Getters;
use log::{debug, info, warn};
use reqwest::{header, IntoUrl};
use scraper::Html;
use tokio::time::sleep;
use url::Url;

use crate::{
    config::Config,
    parser::{
        report::{self, Report, ReportError},
        results::{self, find_report_link, is_results_page},
    },
    query::ResultsQuery,
    schema::{LabNumber, ResultsRow},
};

/// A fetched and parsed results page.
#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct ResultsPage {
    query: ResultsQuery,
    url: Url,
    rows: Vec<ResultsRow>,
}

pub struct LabClient {
    client: reqwest::Client,
    base_url: Url,
    max_retries: usize,
    retry_interval: Duration,
}

impl LabClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest_client(config)?,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            retry_interval: config.request_interval()?,
        })
    }

    async fn fetch_text(&self, url: impl IntoUrl) -> anyhow::Result<(Url, String)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            bail!("Unexpected error code: server returned {status:?} for {url}");
        }
        Ok((url, response.text().await?))
    }

    /// Fetches the results page for `query`.
    /// The request is repeated while the page does not have the results table yet.
    pub async fn fetch_results(&self, query: &ResultsQuery) -> anyhow::Result<ResultsPage> {
        let (url, html) = self.fetch_results_html(query).await?;
        let rows = results::parse(&Html::parse_document(&html), &url)
            .with_context(|| format!("While parsing results page {url}"))?;
        info!("Found {} samples on {url}", rows.len());
        Ok(ResultsPage {
            query: query.clone(),
            url,
            rows,
        })
    }

    async fn fetch_results_html(&self, query: &ResultsQuery) -> anyhow::Result<(Url, String)> {
        let url = query.to_url(&self.base_url)?;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                sleep(self.retry_interval).await;
            }
            debug!("Fetching results page {url} (attempt {attempt})");
            let (final_url, html) = self.fetch_text(url.clone()).await?;
            if is_results_page(&html) {
                return Ok((final_url, html));
            }
            warn!("The results page has not loaded yet: {final_url}");
        }
        bail!(
            "The results page did not load after {} attempts: {url}",
            self.max_retries + 1
        )
    }

    /// Fetches and parses the report of `row`.
    ///
    /// If the session key in the link has expired, the results page is loaded again
    /// to renew it, and the report is fetched once more through the new link.
    pub async fn fetch_report(&self, page: &ResultsPage, row: &ResultsRow) -> anyhow::Result<Report> {
        let lab = row.lab_number();
        let url = row
            .report_url()
            .clone()
            .with_context(|| format!("No report link for lab {lab}"))?;
        match self.fetch_report_at(url).await? {
            Ok(report) => return Ok(report),
            Err(ReportError::SessionTimeout) => {
                info!("Session expired while fetching lab {lab}.  Refreshing the results page.")
            }
        }
        let url = self.renew_report_link(page.query(), lab).await?;
        self.fetch_report_at(url)
            .await?
            .with_context(|| format!("Report for lab {lab} timed out again after refreshing"))
    }

    async fn fetch_report_at(&self, url: Url) -> anyhow::Result<Result<Report, ReportError>> {
        debug!("Fetching report {url}");
        let (_, html) = self.fetch_text(url).await?;
        Ok(report::parse(&Html::parse_document(&html)))
    }

    async fn renew_report_link(&self, query: &ResultsQuery, lab: LabNumber) -> anyhow::Result<Url> {
        let (url, html) = self.fetch_results_html(query).await?;
        find_report_link(&Html::parse_document(&html), &url, &lab.to_string())?
            .with_context(|| format!("Lab {lab} is no longer listed on {url}"))
    }
}

fn reqwest_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml"),
    );
    let builder = reqwest::Client::builder()
        // The site keeps the results session in a cookie.
        .cookie_store(true)
        .connection_verbose(true)
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout());
    // Test servers listen on localhost.
    #[cfg(test)]
    let builder = builder.no_proxy();
    builder.build()
}
