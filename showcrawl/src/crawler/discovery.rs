use std::{collections::HashSet, time::Duration};

use scraper::{Html, Selector};
use tokio::time::sleep;
use url::Url;

use super::{
    backoff::jitter,
    idle::{ScrollState, WaitOutcome},
};
use crate::{Browser, CrawlConfig, CrawlError, LoadState, Page};

/// How long the first batch of cards gets to render before scrolling starts anyway.
const FIRST_LINKS_TIMEOUT: Duration = Duration::from_secs(15);
const DOM_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SAMPLE_ANCHORS: usize = 20;

/// Drives a single listing page through the scroll-to-load-more loop.
pub struct Discovery<'a> {
    config: &'a CrawlConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self { config }
    }

    /// Collects up to `target_projects` unique, absolute project URLs in first-seen order.
    ///
    /// Only an unreachable listing page is an error; running out of new content
    /// returns whatever was collected so far.
    pub async fn run<B: Browser>(&self, browser: &B) -> Result<Vec<String>, CrawlError> {
        log::info!(
            "Starting listing scrape for up to {} projects.",
            self.config.target_projects()
        );

        let page = browser
            .new_page()
            .await
            .map_err(|source| CrawlError::Navigation {
                url: self.config.listing_url().to_string(),
                source,
            })?;

        let collected = self.collect(&page).await;
        if let Err(err) = page.close().await {
            log::warn!("Failed to close listing page: {}", err);
        }
        let urls = collected?;

        log::info!("Listing scrape complete. Found {} project URLs.", urls.len());
        Ok(urls)
    }

    async fn collect<P: Page>(&self, page: &P) -> Result<Vec<String>, CrawlError> {
        self.open_listing(page).await?;
        self.await_first_links(page).await;

        let selector = self.config.link_selector();
        let target = self.config.target_projects();
        let tolerance = self.config.scroll_idle_tolerance();

        let mut seen = HashSet::<String>::new();
        let mut ordered = Vec::new();
        let mut state = ScrollState::default();

        for attempt in 1..=self.config.max_scroll_attempts() {
            let before = ordered.len();
            let html = match page.content().await {
                Ok(html) => html,
                Err(err) => {
                    log::warn!("Could not read listing DOM, stopping scroll: {}", err);
                    break;
                }
            };
            for link in harvest_links(&html, selector, self.config.base_url()) {
                if seen.insert(link.clone()) {
                    ordered.push(link);
                }
            }

            if ordered.len() >= target {
                log::info!("Collected required number of project URLs ({}).", target);
                break;
            }
            let scan_grew = ordered.len() > before;

            let rendered = match page.count(selector).await {
                Ok(count) => count,
                Err(err) => {
                    log::warn!("Could not count listing links, stopping scroll: {}", err);
                    break;
                }
            };
            if let Err(err) = page
                .scroll_by_viewport(self.config.scroll_step_multiplier())
                .await
            {
                log::warn!("Scrolling the listing failed, stopping scroll: {}", err);
                break;
            }

            let wait =
                wait_for_growth(page, selector, rendered, self.config.scroll_wait_timeout()).await;
            state = state.advance(scan_grew, wait);
            log::debug!(
                "Scroll attempt {}: {} unique links, {:?}",
                attempt,
                ordered.len(),
                state
            );

            if state.is_exhausted(tolerance) {
                log::warn!(
                    "No new projects detected after {} idle rounds. Stopping scroll.",
                    tolerance
                );
                break;
            }

            sleep(self.config.scroll_pause() + jitter(self.config.rate_delay())).await;
        }

        ordered.truncate(target);
        Ok(ordered)
    }

    async fn open_listing<P: Page>(&self, page: &P) -> Result<(), CrawlError> {
        let url = self.config.listing_url().as_str();
        let timeout = self.config.request_timeout();

        if let Err(err) = page.goto(url, LoadState::NetworkIdle, timeout).await {
            log::warn!(
                "Initial navigation did not settle ({}), retrying with load event.",
                err
            );
            page.goto(url, LoadState::Load, timeout)
                .await
                .map_err(|source| CrawlError::Navigation {
                    url: url.to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    async fn await_first_links<P: Page>(&self, page: &P) {
        let selector = self.config.link_selector();
        if wait_for_growth(page, selector, 0, FIRST_LINKS_TIMEOUT).await == WaitOutcome::Grew {
            return;
        }

        let sample = match page.content().await {
            Ok(html) => sample_anchors(&html),
            Err(_) => Vec::new(),
        };
        log::warn!(
            "Project cards did not appear within {:?}; proceeding with scroll attempts. Found sample anchors: {:?}",
            FIRST_LINKS_TIMEOUT,
            sample
        );
    }
}

/// Polls the DOM until more than `previous` elements match `selector`.
async fn wait_for_growth<P: Page>(
    page: &P,
    selector: &str,
    previous: usize,
    timeout: Duration,
) -> WaitOutcome {
    let poll = async {
        loop {
            match page.count(selector).await {
                Ok(count) if count > previous => return,
                Ok(_) => {}
                Err(err) => log::debug!("Counting links failed while waiting: {}", err),
            }
            sleep(DOM_POLL_INTERVAL).await;
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(()) => WaitOutcome::Grew,
        Err(_) => WaitOutcome::TimedOut,
    }
}

/// Extracts matching links from a listing snapshot in document order.
///
/// Query strings are dropped and relative links are resolved against `base`;
/// duplicates within the snapshot are kept, the caller deduplicates.
pub fn harvest_links(html: &str, selector: &str, base: &Url) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(err) => {
            log::error!("Invalid link selector {:?}: {}", selector, err);
            return Vec::new();
        }
    };

    Html::parse_document(html)
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| {
            let cleaned = href.split('?').next().unwrap_or(href).trim();
            if cleaned.is_empty() {
                return None;
            }
            base.join(cleaned).ok().map(String::from)
        })
        .collect()
}

fn sample_anchors(html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    Html::parse_document(html)
        .select(&selector)
        .take(SAMPLE_ANCHORS)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing::ScriptedBrowser, CrawlerBuilder};

    const LISTING: &str = "https://devfolio.co/search?primary_filter=projects";

    fn cards(slugs: &[&str]) -> String {
        let anchors: String = slugs
            .iter()
            .map(|slug| format!(r#"<div class="card"><a href="/projects/{slug}?ref=search">{slug}</a></div>"#))
            .collect();
        format!("<html><body><main>{anchors}<a href=\"/about\">about</a></main></body></html>")
    }

    fn crawler(target: usize) -> crate::Crawler {
        CrawlerBuilder::new()
            .target_projects(target)
            .rate_delay(Duration::ZERO, Duration::ZERO)
            .scroll_idle_tolerance(3)
            .max_scroll_attempts(40)
            .build()
            .unwrap()
    }

    #[test]
    fn harvest_strips_queries_and_resolves_against_base() {
        let base = Url::parse("https://devfolio.co").unwrap();
        let html = r#"<a href="/projects/a?x=1">A</a><a href="https://devfolio.co/projects/b">B</a><a href="/hackathons">H</a><a href="/projects/a">A again</a>"#;

        let links = harvest_links(html, r#"a[href*="/projects/"]"#, &base);

        assert_eq!(
            links,
            vec![
                "https://devfolio.co/projects/a",
                "https://devfolio.co/projects/b",
                "https://devfolio.co/projects/a",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_target_in_document_order() {
        let browser = ScriptedBrowser::new()
            .with_listing(LISTING, vec![cards(&["one", "two", "three", "four", "five"])]);

        let urls = crawler(3).discover(&browser).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://devfolio.co/projects/one",
                "https://devfolio.co/projects/two",
                "https://devfolio.co/projects/three",
            ]
        );
        assert_eq!(browser.scrolls(), 0);
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn collects_across_scrolls_without_duplicates() {
        let browser = ScriptedBrowser::new().with_listing(
            LISTING,
            vec![
                cards(&["a", "b"]),
                cards(&["a", "b", "b", "c"]),
                cards(&["a", "b", "c", "d", "a"]),
            ],
        );

        let urls = crawler(10).discover(&browser).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://devfolio.co/projects/a",
                "https://devfolio.co/projects/b",
                "https://devfolio.co/projects/c",
                "https://devfolio.co/projects/d",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_listing_ends_after_idle_tolerance() {
        let browser = ScriptedBrowser::new().with_listing(LISTING, vec![cards(&[])]);

        let urls = crawler(10).discover(&browser).await.unwrap();

        assert!(urls.is_empty());
        assert_eq!(browser.scrolls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cap_bounds_a_listing_that_keeps_growing() {
        let frames = (1..=100)
            .map(|n| {
                let slugs: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
                let slugs: Vec<&str> = slugs.iter().map(String::as_str).collect();
                cards(&slugs)
            })
            .collect();
        let browser = ScriptedBrowser::new().with_listing(LISTING, frames);
        let crawler = CrawlerBuilder::new()
            .target_projects(1000)
            .max_scroll_attempts(5)
            .rate_delay(Duration::ZERO, Duration::ZERO)
            .build()
            .unwrap();

        let urls = crawler.discover(&browser).await.unwrap();

        assert_eq!(browser.scrolls(), 5);
        assert_eq!(urls.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_load_event() {
        let browser = ScriptedBrowser::new()
            .with_listing(LISTING, vec![cards(&["x"])])
            .listing_never_idles();

        let urls = crawler(1).discover(&browser).await.unwrap();

        assert_eq!(urls, vec!["https://devfolio.co/projects/x"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_listing_is_a_navigation_error() {
        let browser = ScriptedBrowser::new()
            .with_listing(LISTING, vec![cards(&["x"])])
            .listing_unreachable();

        let result = crawler(1).discover(&browser).await;

        assert!(matches!(result, Err(CrawlError::Navigation { .. })));
        assert_eq!(browser.open_pages(), 0);
    }
}
