use std::fmt::Display;

use tokio::{sync::Semaphore, time::sleep};
use url::Url;

use super::{
    backoff::{jitter, retry_delay},
    FailedUrl, PageError, ScrapeOutcome,
};
use crate::{Browser, BrowserError, CrawlConfig, FromHTML, LoadState, Page};

/// Scrapes one URL end to end, retrying with linear backoff.
pub struct UrlProcessor<'a> {
    config: &'a CrawlConfig,
    slots: &'a Semaphore,
}

impl<'a> UrlProcessor<'a> {
    pub fn new(config: &'a CrawlConfig, slots: &'a Semaphore) -> Self {
        Self { config, slots }
    }

    pub async fn process<B, T>(&self, browser: &B, url: String) -> ScrapeOutcome<T>
    where
        B: Browser,
        T: FromHTML<Output = T>,
        T::Error: Display,
    {
        let max_attempts = self.config.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt::<B, T>(browser, &url).await {
                Ok(record) => {
                    if attempt > 1 {
                        log::info!("Scraped {} on attempt {}/{}", url, attempt, max_attempts);
                    }
                    return ScrapeOutcome::Success(record);
                }
                Err(err) => {
                    log::warn!(
                        "Error scraping {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        max_attempts,
                        err
                    );
                    last_error = err.to_string();
                }
            }

            if attempt < max_attempts {
                sleep(retry_delay(self.config.retry_backoff(), attempt)).await;
            }
        }

        log::error!("Failed to scrape {} after {} attempts.", url, max_attempts);
        ScrapeOutcome::Failure(FailedUrl {
            url,
            attempts: max_attempts,
            last_error,
        })
    }

    /// One attempt on a fresh page. The page is closed before the slot is released.
    async fn attempt<B, T>(&self, browser: &B, url: &str) -> Result<T, PageError>
    where
        B: Browser,
        T: FromHTML<Output = T>,
        T::Error: Display,
    {
        // only a closed semaphore refuses a permit
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| BrowserError::Closed)?;

        let page = browser.new_page().await?;
        let result = self.load_and_extract::<_, T>(&page, url).await;
        if result.is_err() {
            self.capture(&page, url).await;
        }
        if let Err(err) = page.close().await {
            log::debug!("Failed to close page for {}: {}", url, err);
        }

        result
    }

    async fn load_and_extract<P, T>(&self, page: &P, url: &str) -> Result<T, PageError>
    where
        P: Page,
        T: FromHTML<Output = T>,
        T::Error: Display,
    {
        let timeout = self.config.request_timeout();
        let navigation = tokio::time::timeout(timeout, page.goto(url, LoadState::NetworkIdle, timeout));
        match navigation.await {
            Ok(Ok(())) => {}
            Err(_) | Ok(Err(BrowserError::Timeout(_))) => {
                return Err(PageError::Timeout {
                    url: url.to_string(),
                    timeout,
                })
            }
            Ok(Err(err)) => return Err(err.into()),
        }

        // Let late content settle and keep the request rate human-like.
        sleep(jitter(self.config.rate_delay())).await;

        let html = page.content().await?;
        T::from_html(url, &html).map_err(|err| PageError::Extraction(err.to_string()))
    }

    /// Best-effort full-page screenshot for post-mortem debugging.
    async fn capture<P: Page>(&self, page: &P, url: &str) {
        let Some(dir) = self.config.screenshot_dir() else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            log::debug!("Cannot create screenshot dir {}: {}", dir.display(), err);
            return;
        }

        let path = dir.join(format!("{}.png", screenshot_name(url)));
        if let Err(err) = page.screenshot(&path).await {
            log::debug!("Screenshot of {} failed: {}", url, err);
        }
    }
}

/// Filesystem-safe name derived from the URL path.
pub fn screenshot_name(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    path.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_name_flattens_the_path() {
        assert_eq!(
            screenshot_name("https://devfolio.co/projects/cool-thing?x=1"),
            "_projects_cool-thing"
        );
    }
}
