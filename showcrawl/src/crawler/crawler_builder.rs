use std::{path::PathBuf, sync::Arc, time::Duration};

use url::Url;

use crate::{CrawlConfig, CrawlError, Crawler, NoProgress, Progress};

pub const DEFAULT_BASE_URL: &str = "https://devfolio.co";
pub const DEFAULT_LISTING_PATH: &str = "/search?primary_filter=projects";
pub const DEFAULT_LINK_SELECTOR: &str = r#"a[href*="/projects/"]"#;

/// Upper bound on simultaneously open pages.
pub const MAX_CONCURRENCY: usize = 256;

pub struct CrawlerBuilder {
    base_url: String,
    listing_path: String,
    link_selector: String,
    target_projects: usize,
    concurrency: usize,
    request_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    scroll_pause: Duration,
    max_scroll_attempts: usize,
    scroll_idle_tolerance: u32,
    scroll_wait_timeout: Duration,
    scroll_step_multiplier: f64,
    rate_delay: (Duration, Duration),
    headless: bool,
    screenshot_dir: Option<PathBuf>,
    progress: Arc<dyn Progress>,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            target_projects: 1000,
            concurrency: 6,
            request_timeout: Duration::from_secs(45),
            max_retries: 3,
            retry_backoff: Duration::from_secs(3),
            scroll_pause: Duration::from_millis(1500),
            max_scroll_attempts: 250,
            scroll_idle_tolerance: 12,
            scroll_wait_timeout: Duration::from_secs(6),
            scroll_step_multiplier: 0.9,
            rate_delay: (Duration::from_millis(500), Duration::from_millis(1800)),
            headless: true,
            screenshot_dir: None,
            progress: Arc::new(NoProgress),
        }
    }
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn listing_path(mut self, listing_path: impl Into<String>) -> Self {
        self.listing_path = listing_path.into();
        self
    }

    pub fn link_selector(mut self, link_selector: impl Into<String>) -> Self {
        self.link_selector = link_selector.into();
        self
    }

    pub fn target_projects(mut self, target_projects: usize) -> Self {
        self.target_projects = target_projects;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn scroll_pause(mut self, scroll_pause: Duration) -> Self {
        self.scroll_pause = scroll_pause;
        self
    }

    pub fn max_scroll_attempts(mut self, max_scroll_attempts: usize) -> Self {
        self.max_scroll_attempts = max_scroll_attempts;
        self
    }

    pub fn scroll_idle_tolerance(mut self, scroll_idle_tolerance: u32) -> Self {
        self.scroll_idle_tolerance = scroll_idle_tolerance;
        self
    }

    pub fn scroll_wait_timeout(mut self, scroll_wait_timeout: Duration) -> Self {
        self.scroll_wait_timeout = scroll_wait_timeout;
        self
    }

    pub fn scroll_step_multiplier(mut self, scroll_step_multiplier: f64) -> Self {
        self.scroll_step_multiplier = scroll_step_multiplier;
        self
    }

    pub fn rate_delay(mut self, min: Duration, max: Duration) -> Self {
        self.rate_delay = (min, max);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn screenshot_dir<O>(mut self, screenshot_dir: O) -> Self
    where
        O: Into<Option<PathBuf>>,
    {
        self.screenshot_dir = screenshot_dir.into();
        self
    }

    pub fn progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Validates the URLs and selector and clamps tuning knobs into sane ranges.
    pub fn build(self) -> Result<Crawler, CrawlError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|err| CrawlError::Config(format!("base url {:?}: {err}", self.base_url)))?;
        let listing_url = base_url.join(&self.listing_path).map_err(|err| {
            CrawlError::Config(format!("listing path {:?}: {err}", self.listing_path))
        })?;
        scraper::Selector::parse(&self.link_selector).map_err(|err| {
            CrawlError::Config(format!("link selector {:?}: {err}", self.link_selector))
        })?;

        let (rate_min, rate_max) = self.rate_delay;

        let config = CrawlConfig {
            base_url,
            listing_url,
            link_selector: self.link_selector,
            target_projects: self.target_projects.max(1),
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            scroll_pause: self.scroll_pause.max(Duration::from_millis(100)),
            max_scroll_attempts: self.max_scroll_attempts,
            scroll_idle_tolerance: self.scroll_idle_tolerance.max(1),
            scroll_wait_timeout: self.scroll_wait_timeout.max(Duration::from_secs(1)),
            scroll_step_multiplier: self.scroll_step_multiplier.clamp(0.1, 2.0),
            rate_delay: (rate_min, rate_max.max(rate_min)),
            headless: self.headless,
            screenshot_dir: self.screenshot_dir,
        };

        Ok(Crawler::new(config, self.progress))
    }
}
