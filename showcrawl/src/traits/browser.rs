use std::{path::Path, time::Duration};

use async_trait::async_trait;

/// Which completion signal a navigation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No network activity for a short quiet window after the load event.
    NetworkIdle,
    /// The document `load` event.
    Load,
}

#[derive(thiserror::Error, Debug)]
pub enum BrowserError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Navigation Error: {0}")]
    Navigation(String),

    #[error("Script Error: {0}")]
    Script(String),

    #[error("Driver Error: {0}")]
    Driver(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page is already closed")]
    Closed,
}

/// A browser able to hand out isolated pages.
///
/// Implementations are shared by reference between every concurrent worker, so
/// `new_page` must be safe to call from many tasks at once.
#[async_trait]
pub trait Browser: Send + Sync {
    type Page: Page;

    async fn new_page(&self) -> Result<Self::Page, BrowserError>;

    /// Tears down every page still open. Pending operations on those pages fail.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single tab owned by exactly one task.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, until: LoadState, timeout: Duration)
        -> Result<(), BrowserError>;

    /// The serialized DOM as currently rendered.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Scrolls down by `multiplier` times the viewport height.
    async fn scroll_by_viewport(&self, multiplier: f64) -> Result<(), BrowserError>;

    /// Number of elements currently matching a CSS selector.
    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
