use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tokio::time::sleep;

/// One page of markup per identifier. The runner is generic over this so
/// tests can script pages without a network.
pub trait PageSource {
    fn fetch(&self, asin: &str) -> impl std::future::Future<Output = anyhow::Result<String>>;
}

/// Fetches product pages with a fixed desktop-browser header set, one
/// persistent client per chunk, and a fixed delay after every request.
pub struct Fetcher {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl Fetcher {
    pub fn new(base_url: &str, delay_ms: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn product_url(&self, asin: &str) -> String {
        format!("{}/dp/{}", self.base_url, sanitize_asin(asin))
    }

    async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        // No status gating: challenge pages can arrive as 503 with a
        // parseable body, and the extractor must see it.
        let res = self.client.get(url).send().await?;
        Ok(res.text().await?)
    }
}

impl PageSource for Fetcher {
    async fn fetch(&self, asin: &str) -> anyhow::Result<String> {
        let url = self.product_url(asin);
        let result = self.get_text(&url).await;

        // polite delay, applied whether or not the fetch succeeded
        sleep(self.delay).await;

        result
    }
}

/// Strip everything that is not alphanumeric before the code goes into a URL.
pub fn sanitize_asin(asin: &str) -> String {
    asin.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
        ),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"macOS\""),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}
