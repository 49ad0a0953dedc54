use std::time::Duration;

use async_trait::async_trait;

use super::{FetchError, FetchedPage, PageFetcher};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const TIMEOUT: Duration = Duration::from_secs(15);

/// reqwest によるページ取得（リトライなし）
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("HTTP クライアントの作成に失敗: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        };

        log::info!("ページ取得開始: {url}");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(network)?
            .error_for_status()
            .map_err(network)?;

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(network)?;
        log::debug!("ページ取得完了: {final_url} ({} bytes)", body.len());

        Ok(FetchedPage { final_url, body })
    }

    fn name(&self) -> &str {
        "http"
    }
}
