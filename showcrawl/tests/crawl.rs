use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use showcrawl::{
    Browser, BrowserError, CrawlError, Crawler, Harvest, LoadState, Page, ProjectRecord, Progress,
};

const LISTING_HTML: &str = r#"<main>
    <a href="/projects/lumen?from=feed">Lumen</a>
    <a href="/projects/quill">Quill</a>
    <a href="/projects/lumen">Lumen again</a>
</main>"#;

/// Serves a fixed listing and one static page per project; `down` pages always fail.
struct StaticSite {
    down: Vec<&'static str>,
    reachable: bool,
}

struct StaticPage {
    down: Vec<&'static str>,
    reachable: bool,
    html: Mutex<String>,
}

#[async_trait]
impl Browser for StaticSite {
    type Page = StaticPage;

    async fn new_page(&self) -> Result<StaticPage, BrowserError> {
        Ok(StaticPage {
            down: self.down.clone(),
            reachable: self.reachable,
            html: Mutex::new(String::new()),
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn goto(&self, url: &str, _until: LoadState, _timeout: Duration) -> Result<(), BrowserError> {
        if !self.reachable {
            return Err(BrowserError::Navigation("connection refused".into()));
        }
        let html = if url.contains("/search") {
            LISTING_HTML.to_string()
        } else if self.down.iter().any(|slug| url.ends_with(slug)) {
            return Err(BrowserError::Navigation("502".into()));
        } else {
            let slug = url.rsplit('/').next().unwrap_or_default();
            format!("<title>{slug} | Devfolio</title><h2>Challenges we faced</h2><p>Naming {slug}.</p>")
        };
        *self.html.lock().unwrap() = html;
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.html.lock().unwrap().clone())
    }

    async fn scroll_by_viewport(&self, _multiplier: f64) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn count(&self, _selector: &str) -> Result<usize, BrowserError> {
        Ok(if self.html.lock().unwrap().contains("/projects/") { 3 } else { 0 })
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[derive(Default)]
struct Ticks(AtomicUsize);

impl Progress for Ticks {
    fn advance(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn crawler(progress: Arc<Ticks>) -> Crawler {
    Crawler::builder()
        .target_projects(10)
        .max_retries(1)
        .retry_backoff(Duration::from_millis(10))
        .rate_delay(Duration::ZERO, Duration::ZERO)
        .scroll_idle_tolerance(1)
        .progress(progress)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn crawl_reports_records_and_failures() {
    let ticks = Arc::new(Ticks::default());
    let site = StaticSite {
        down: vec!["quill"],
        reachable: true,
    };

    let harvest: Harvest<ProjectRecord> = crawler(ticks.clone()).crawl(&site).await.unwrap();

    assert_eq!(harvest.records.len(), 1);
    let record = &harvest.records[0];
    assert_eq!(record.url, "https://devfolio.co/projects/lumen");
    assert_eq!(record.name, "lumen");
    assert_eq!(record.challenges_faced, "Naming lumen.");

    assert_eq!(
        harvest.failed_urls().collect::<Vec<_>>(),
        vec!["https://devfolio.co/projects/quill"]
    );
    assert_eq!(harvest.failures[0].attempts, 2);
    assert_eq!(ticks.0.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_listing_fails_the_crawl() {
    let site = StaticSite {
        down: vec![],
        reachable: false,
    };

    let result = crawler(Arc::default()).crawl::<_, ProjectRecord>(&site).await;

    assert!(matches!(result, Err(CrawlError::Navigation { .. })));
}
