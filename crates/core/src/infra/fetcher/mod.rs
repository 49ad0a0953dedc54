mod html;
mod http;

pub use html::{extract, NO_LINK_FOUND};
pub use http::HttpFetcher;

use async_trait::async_trait;

use crate::domain::error::AppError;

/// 取得・抽出エラー
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("Please provide {0} for this mode.")]
    EmptyInput(&'static str),
    #[error("Network Error for {url}:\n{message}")]
    Network { url: String, message: String },
    #[error("Could not find a <body> tag in {0}.")]
    NoBody(String),
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidUrl(_) | FetchError::EmptyInput(_) => {
                AppError::validation(e.to_string())
            }
            FetchError::Network { .. } => AppError::network(e.to_string()),
            FetchError::NoBody(_) => AppError::internal(e.to_string()),
        }
    }
}

/// 取得したページ（リダイレクト後の URL を保持）
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

/// ページ取得 trait（テストではスタブに差し替える）
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    fn name(&self) -> &str;
}
