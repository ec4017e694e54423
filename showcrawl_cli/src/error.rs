use showcrawl::{items::ExtractError, BrowserError, CrawlError};
use thirtyfour::error::WebDriverError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("WebDriver Error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("Browser Error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Crawl Error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Extraction Error: {0}")]
    Extract(#[from] ExtractError),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No project URLs collected")]
    NoUrls,

    #[error("Interrupted by user")]
    Interrupted,
}
