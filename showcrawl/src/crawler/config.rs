use std::{path::PathBuf, time::Duration};

use url::Url;

/// Immutable run parameters of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub(super) base_url: Url,
    pub(super) listing_url: Url,
    pub(super) link_selector: String,
    pub(super) target_projects: usize,
    pub(super) concurrency: usize,
    pub(super) request_timeout: Duration,
    pub(super) max_retries: u32,
    pub(super) retry_backoff: Duration,
    pub(super) scroll_pause: Duration,
    pub(super) max_scroll_attempts: usize,
    pub(super) scroll_idle_tolerance: u32,
    pub(super) scroll_wait_timeout: Duration,
    pub(super) scroll_step_multiplier: f64,
    pub(super) rate_delay: (Duration, Duration),
    pub(super) headless: bool,
    pub(super) screenshot_dir: Option<PathBuf>,
}

impl CrawlConfig {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    pub fn link_selector(&self) -> &str {
        &self.link_selector
    }

    pub fn target_projects(&self) -> usize {
        self.target_projects
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts a single URL gets before it is recorded as failed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn scroll_pause(&self) -> Duration {
        self.scroll_pause
    }

    pub fn max_scroll_attempts(&self) -> usize {
        self.max_scroll_attempts
    }

    pub fn scroll_idle_tolerance(&self) -> u32 {
        self.scroll_idle_tolerance
    }

    pub fn scroll_wait_timeout(&self) -> Duration {
        self.scroll_wait_timeout
    }

    pub fn scroll_step_multiplier(&self) -> f64 {
        self.scroll_step_multiplier
    }

    pub fn rate_delay(&self) -> (Duration, Duration) {
        self.rate_delay
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn screenshot_dir(&self) -> Option<&PathBuf> {
        self.screenshot_dir.as_ref()
    }
}
