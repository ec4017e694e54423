use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::json;
use showcrawl::{Browser, BrowserError, LoadState, Page};
use thirtyfour::{error::WebDriverError, ChromeCapabilities, DesiredCapabilities, WebDriver};
use tokio::time::{sleep, Instant};

use crate::{
    error::AppError,
    sessions::{Session, SessionRegistry},
};

/// Resource count once the document is complete, `-1` while it is still loading.
const NETWORK_PROBE: &str = "return document.readyState === 'complete' \
    ? performance.getEntriesByType('resource').length : -1;";
const SCROLL_SCRIPT: &str = "window.scrollBy(0, window.innerHeight * arguments[0]);";
const COUNT_SCRIPT: &str = "return document.querySelectorAll(arguments[0]).length;";

/// How long the resource count must stay flat before the network counts as idle.
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Chrome driven through a WebDriver server such as chromedriver.
///
/// Every page is its own WebDriver session, so concurrent workers never share
/// a window handle. All sessions are tracked and quit by [`Browser::close`].
pub struct WebDriverBrowser {
    server_url: String,
    caps: ChromeCapabilities,
    sessions: Arc<SessionRegistry<WebDriver>>,
}

impl WebDriverBrowser {
    pub fn new(server_url: &str, headless: bool) -> Result<Self, AppError> {
        let mut caps = DesiredCapabilities::chrome();

        if headless {
            caps.add_chrome_arg("--headless")?;
        }

        caps.add_chrome_arg("--no-sandbox")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;
        caps.add_chrome_arg("--disable-gpu")?;

        caps.add_chrome_option(
            "prefs",
            json!({
                "profile.default_content_settings": {
                    "images": 2 // Do not load images.
                },
                "profile.managed_default_content_settings": {
                    "images": 2 // Do not load images.
                }
            }),
        )?;

        Ok(Self {
            server_url: server_url.to_string(),
            caps,
            sessions: Arc::default(),
        })
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Page = WebDriverPage;

    async fn new_page(&self) -> Result<WebDriverPage, BrowserError> {
        let server_url = self.server_url.clone();
        let caps = self.caps.clone();
        let (id, driver) = self
            .sessions
            .open(async move { WebDriver::new(&server_url, caps).await.map_err(driver_error) })
            .await?;

        Ok(WebDriverPage {
            id,
            driver,
            sessions: self.sessions.clone(),
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.sessions.close().await
    }
}

#[async_trait]
impl Session for WebDriver {
    async fn quit(self) -> Result<(), BrowserError> {
        WebDriver::quit(self).await.map_err(driver_error)
    }
}

pub struct WebDriverPage {
    id: u64,
    driver: WebDriver,
    sessions: Arc<SessionRegistry<WebDriver>>,
}

impl WebDriverPage {
    /// Waits until the document is complete and no new resources were fetched
    /// during one quiet window.
    async fn settle_network(&self) -> Result<(), BrowserError> {
        let mut last = None;
        loop {
            let probe = self
                .driver
                .execute(NETWORK_PROBE, Vec::new())
                .await
                .map_err(driver_error)?;
            let resources = probe.json().as_i64().filter(|count| *count >= 0);

            if resources.is_some() && resources == last {
                return Ok(());
            }
            last = resources;
            sleep(NETWORK_QUIET_WINDOW).await;
        }
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str, until: LoadState, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        self.driver
            .set_page_load_timeout(timeout)
            .await
            .map_err(driver_error)?;

        match tokio::time::timeout_at(deadline, self.driver.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(BrowserError::Navigation(err.to_string())),
            Err(_) => return Err(BrowserError::Timeout(timeout)),
        }

        if until == LoadState::NetworkIdle {
            tokio::time::timeout_at(deadline, self.settle_network())
                .await
                .map_err(|_| BrowserError::Timeout(timeout))??;
        }

        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.driver.source().await.map_err(driver_error)
    }

    async fn scroll_by_viewport(&self, multiplier: f64) -> Result<(), BrowserError> {
        self.driver
            .execute(SCROLL_SCRIPT, vec![json!(multiplier)])
            .await
            .map_err(driver_error)?;
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        let ret = self
            .driver
            .execute(COUNT_SCRIPT, vec![json!(selector)])
            .await
            .map_err(driver_error)?;

        ret.json()
            .as_u64()
            .map(|count| count as usize)
            .ok_or_else(|| BrowserError::Script(format!("unexpected count result: {}", ret.json())))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        self.driver.screenshot(path).await.map_err(driver_error)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.sessions.release(self.id).await
    }
}

fn driver_error(err: WebDriverError) -> BrowserError {
    BrowserError::Driver(err.to_string())
}
