use anyhow::{Context, Error, Result};
use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("quotelock/", env!("CARGO_PKG_VERSION"));

const RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 500;

/// Retries an async request while it fails with a transient error
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the last error. Errors carrying an HTTP
/// status are not retried.
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay_ms: u64) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries || err.status().is_some() {
                    return Err(err.into());
                }
                debug!(attempt, retries, error = %err, "Request failed, retrying");
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// GETs `url` and returns the body of a successful response.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = with_retry(
        || async { client.get(url).send().await?.error_for_status() },
        RETRIES,
        RETRY_DELAY_MS,
    )
    .await
    .with_context(|| format!("Request to {url} failed"))?;
    response
        .text()
        .await
        .context("Failed to get response text")
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("Invalid selector {css}: {err}"))
}

/// Text of an element with runs of whitespace collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
    let selector = selector(css)?;
    Ok(document.select(&selector).next().map(|e| element_text(&e)))
}

/// Parses an RSS document. CDATA markers are dropped so their content is
/// visible as text.
pub fn parse_feed(body: &str) -> Html {
    Html::parse_document(&body.replace("<![CDATA[", "").replace("]]>", ""))
}

/// Title and description of the first feed item.
pub fn first_feed_item(feed: &Html) -> Result<Option<(String, String)>> {
    let item = selector("item")?;
    let title = selector("title")?;
    let description = selector("description")?;
    let Some(first) = feed.select(&item).next() else {
        return Ok(None);
    };
    let text_of = |s: &Selector| {
        first
            .select(s)
            .next()
            .map(|e| element_text(&e))
            .unwrap_or_default()
    };
    Ok(Some((text_of(&title), text_of(&description))))
}
