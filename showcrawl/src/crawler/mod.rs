use std::{fmt::Display, sync::Arc};

use crate::{Browser, FromHTML, Progress};

pub mod backoff;
mod config;
mod crawler_builder;
mod discovery;
mod error;
mod idle;
mod processor;
mod scraper;
mod url_processor;

pub use config::CrawlConfig;
pub use crawler_builder::CrawlerBuilder;
pub use error::{CrawlError, PageError};
pub use idle::{ScrollState, WaitOutcome};
pub use processor::{FailedUrl, Harvest, ScrapeOutcome};

use self::discovery::Discovery;
use self::scraper::Scraper;

/// Discovers project URLs from an infinite-scroll listing, then scrapes each one.
pub struct Crawler {
    /// Run parameters, fixed for the lifetime of the crawler.
    config: CrawlConfig,

    /// Observer notified once per URL that reaches a terminal outcome.
    progress: Arc<dyn Progress>,
}

impl Crawler {
    pub(crate) fn new(config: CrawlConfig, progress: Arc<dyn Progress>) -> Self {
        Self { config, progress }
    }

    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the listing scroll loop on a single page of `browser`.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Navigation`] when the listing page cannot be loaded even with
    /// the load-event fallback. Running out of new links is not an error.
    pub async fn discover<B: Browser>(&self, browser: &B) -> Result<Vec<String>, CrawlError> {
        Discovery::new(&self.config).run(browser).await
    }

    /// Scrapes `urls` concurrently. Never fails as a whole; per-URL failures are
    /// reported in [`Harvest::failures`].
    pub async fn scrape<B, T>(&self, browser: &B, urls: Vec<String>) -> Harvest<T>
    where
        B: Browser,
        T: FromHTML<Output = T> + Send,
        T::Error: Display,
    {
        Scraper::new(&self.config, self.progress.clone())
            .scrape_all(browser, urls)
            .await
    }

    /// Discovery followed by scraping. The caller closes `browser` afterwards.
    pub async fn crawl<B, T>(&self, browser: &B) -> Result<Harvest<T>, CrawlError>
    where
        B: Browser,
        T: FromHTML<Output = T> + Send,
        T::Error: Display,
    {
        let mut urls = self.discover(browser).await?;
        urls.truncate(self.config.target_projects());
        if urls.is_empty() {
            log::warn!("No project URLs collected.");
        }

        Ok(self.scrape(browser, urls).await)
    }
}
