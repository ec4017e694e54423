use std::time::Duration;

use crate::BrowserError;

/// Errors that abort a whole crawl.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    #[error("Listing page {url} could not be loaded: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Errors confined to a single attempt on a single URL.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    #[error("Page {url} did not load within {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Browser Error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Extraction Error: {0}")]
    Extraction(String),
}
