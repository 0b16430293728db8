//! A minimal HTTP server on localhost serving canned pages to the client in tests.

use std::sync::Arc;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use url::Url;

use crate::config::Config;

/// Starts a server answering every request with `handler(path_and_query)`,
/// which gives the status code and the body.  Returns the base URL of the server.
pub async fn serve<F>(handler: F) -> Url
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = respond(stream, &*handler).await;
            });
        }
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

async fn respond<F>(mut stream: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(&str) -> (u16, String),
{
    let (read, mut write) = stream.split();
    let mut reader = BufReader::new(read);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_owned();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line.trim().is_empty() {
            break;
        }
    }
    let (status, body) = handler(&target);
    let response = format!(
        "HTTP/1.1 {status} Fixture\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    write.write_all(response.as_bytes()).await?;
    write.shutdown().await
}

/// Config pointing at `base_url`, without delays between requests.
pub fn config(base_url: Url, max_retries: usize) -> Config {
    Config {
        base_url,
        request_interval: 0.0,
        max_retries,
        timeout_secs: 10,
        ..Config::default()
    }
}

/// A results page listing `labs`, with report links carrying the session `key`.
pub fn results_page(key: &str, labs: &[u32]) -> String {
    let rows: String = labs
        .iter()
        .enumerate()
        .map(|(i, lab)| {
            format!(
                r#"<tr><td>SMITH FARM</td><td>05/09/2025</td><td>{}</td><td><a href="report.aspx?key={key}&amp;lab={lab}">{lab}</a></td><td>5.4</td><td>7.70</td></tr>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body><table>
<tr><th>Name</th><th>Date Sampled</th><th>Sample No</th><th>LabNum</th><th>Soil pH</th><th>Buffer pH</th></tr>
{rows}
</table></body></html>"#
    )
}

pub fn report_page() -> String {
    "<html><body><p>Crop 1: Warm-Season Grass Maintenance</p><p>Lime: 25.0 lb/1000 sq ft</p></body></html>"
        .to_owned()
}

pub fn timeout_page() -> String {
    "<html><body><h1>Page Timeout</h1><p>Please REFRESH your Results page.</p></body></html>"
        .to_owned()
}

pub fn loading_page() -> String {
    "<html><body><p>Loading...</p></body></html>".to_owned()
}
