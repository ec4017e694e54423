use indicatif::{ProgressBar, ProgressStyle};
use showcrawl::Progress;

/// Terminal progress bar over scraped project pages.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("Scraping projects [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::hidden();
        bar.set_style(style);
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn advance(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
