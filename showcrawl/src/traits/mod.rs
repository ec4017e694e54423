mod browser;
mod from_html;
mod progress;

pub use browser::{Browser, BrowserError, LoadState, Page};
pub use from_html::FromHTML;
pub use progress::{NoProgress, Progress};
