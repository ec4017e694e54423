//! In-memory browser scripted per URL, used by the crawler tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{Browser, BrowserError, LoadState, Page};

/// What a content page does on one navigation attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Html(String),
    /// Never finishes loading.
    Hang,
    Fail(&'static str),
}

#[derive(Default)]
struct State {
    listing_url: String,
    frames: Vec<String>,
    idle_fails: bool,
    load_fails: bool,
    scripts: HashMap<String, Vec<Step>>,
    attempts: Mutex<HashMap<String, usize>>,
    scrolls: AtomicUsize,
    open: AtomicUsize,
    peak: AtomicUsize,
    screenshots: Mutex<Vec<PathBuf>>,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    state: Arc<State>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut State {
        Arc::get_mut(&mut self.state).expect("configure the browser before sharing it")
    }

    /// Each frame is the listing DOM after that many scrolls; the last one repeats.
    pub fn with_listing(mut self, url: &str, frames: Vec<String>) -> Self {
        let state = self.state_mut();
        state.listing_url = url.to_string();
        state.frames = frames;
        self
    }

    pub fn listing_never_idles(mut self) -> Self {
        self.state_mut().idle_fails = true;
        self
    }

    pub fn listing_unreachable(mut self) -> Self {
        let state = self.state_mut();
        state.idle_fails = true;
        state.load_fails = true;
        self
    }

    /// Steps are consumed one per attempt; the last one repeats.
    pub fn with_page(mut self, url: &str, steps: Vec<Step>) -> Self {
        self.state_mut().scripts.insert(url.to_string(), steps);
        self
    }

    pub fn attempts(&self, url: &str) -> usize {
        let attempts = self.state.attempts.lock().unwrap();
        attempts.get(url).copied().unwrap_or(0)
    }

    pub fn scrolls(&self) -> usize {
        self.state.scrolls.load(Ordering::SeqCst)
    }

    pub fn open_pages(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn peak_open_pages(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.screenshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    type Page = ScriptedPage;

    async fn new_page(&self) -> Result<ScriptedPage, BrowserError> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        let open = self.state.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(open, Ordering::SeqCst);
        Ok(ScriptedPage {
            state: self.state.clone(),
            html: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ScriptedPage {
    state: Arc<State>,
    html: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl ScriptedPage {
    fn current(&self) -> Result<String, BrowserError> {
        if let Some(html) = self.html.lock().unwrap().clone() {
            return Ok(html);
        }
        let frames = &self.state.frames;
        let index = self.state.scrolls.load(Ordering::SeqCst).min(frames.len().saturating_sub(1));
        frames.get(index).cloned().ok_or(BrowserError::Closed)
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn goto(&self, url: &str, until: LoadState, timeout: Duration) -> Result<(), BrowserError> {
        if url == self.state.listing_url {
            let fails = match until {
                LoadState::NetworkIdle => self.state.idle_fails,
                LoadState::Load => self.state.load_fails,
            };
            return if fails { Err(BrowserError::Timeout(timeout)) } else { Ok(()) };
        }

        let step = {
            let mut attempts = self.state.attempts.lock().unwrap();
            let attempt = attempts.entry(url.to_string()).or_insert(0);
            *attempt += 1;
            self.state
                .scripts
                .get(url)
                .and_then(|steps| steps.get(*attempt - 1).or(steps.last()))
                .cloned()
                .unwrap_or(Step::Fail("no script for url"))
        };

        // Give other workers a chance to open their pages concurrently.
        tokio::time::sleep(Duration::from_millis(50)).await;

        match step {
            Step::Html(html) => {
                *self.html.lock().unwrap() = Some(html);
                Ok(())
            }
            Step::Hang => {
                tokio::time::sleep(timeout * 10).await;
                Err(BrowserError::Timeout(timeout))
            }
            Step::Fail(reason) => Err(BrowserError::Navigation(reason.to_string())),
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.current()
    }

    async fn scroll_by_viewport(&self, _multiplier: f64) -> Result<(), BrowserError> {
        self.state.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        let html = self.current()?;
        let selector = Selector::parse(selector).map_err(|err| BrowserError::Script(err.to_string()))?;
        Ok(Html::parse_document(&html).select(&selector).count())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        self.state.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
