mod crawler;
pub mod items;
mod traits;

pub use crawler::{
    backoff, CrawlConfig, CrawlError, Crawler, CrawlerBuilder, FailedUrl, Harvest, PageError,
    ScrapeOutcome, ScrollState, WaitOutcome,
};
pub use items::ProjectRecord;
pub use traits::{Browser, BrowserError, FromHTML, LoadState, NoProgress, Page, Progress};

#[cfg(test)]
pub(crate) mod testing;
