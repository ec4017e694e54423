use std::{fmt::Display, sync::Arc};

use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};

use super::{processor::Processor, url_processor::UrlProcessor, Harvest};
use crate::{Browser, CrawlConfig, FromHTML, Progress};

/// Bounded-concurrency worker pool over a fixed set of candidate URLs.
pub struct Scraper<'a> {
    config: &'a CrawlConfig,
    progress: Arc<dyn Progress>,
}

impl<'a> Scraper<'a> {
    pub fn new(config: &'a CrawlConfig, progress: Arc<dyn Progress>) -> Self {
        Self { config, progress }
    }

    /// Scrapes every URL and returns once each one has a terminal outcome.
    ///
    /// All URLs are in flight at once; the semaphore alone limits how many pages
    /// are open. A URL sleeping between retries does not hold a slot.
    pub async fn scrape_all<B, T>(&self, browser: &B, urls: Vec<String>) -> Harvest<T>
    where
        B: Browser,
        T: FromHTML<Output = T> + Send,
        T::Error: Display,
    {
        if urls.is_empty() {
            return Harvest::default();
        }

        let total = urls.len();
        let concurrency = self.config.concurrency();
        self.progress.set_total(total as u64);
        log::info!(
            "Scraping {} project pages with concurrency {}.",
            total,
            concurrency
        );

        let slots = Semaphore::new(concurrency);
        let url_processor = UrlProcessor::new(self.config, &slots);
        let processor = Processor::new(self.progress.clone());
        let (outcomes_tx, outcomes_rx) = mpsc::channel(concurrency * 10);

        let workers = async move {
            futures::stream::iter(urls)
                .for_each_concurrent(None, |url| {
                    let outcomes_tx = outcomes_tx.clone();
                    let url_processor = &url_processor;
                    async move {
                        let outcome = url_processor.process::<B, T>(browser, url).await;
                        let _ = outcomes_tx.send(outcome).await;
                    }
                })
                .await;

            drop(outcomes_tx);
        };

        let ((), harvest) = tokio::join!(workers, processor.collect(outcomes_rx, total));

        log::info!(
            "Scraped {} project pages, {} failed.",
            harvest.records.len(),
            harvest.failures.len()
        );
        harvest
    }
}
