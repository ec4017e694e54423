use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::Progress;

/// A URL that exhausted every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Terminal result for one candidate URL.
#[derive(Debug)]
pub enum ScrapeOutcome<T> {
    Success(T),
    Failure(FailedUrl),
}

/// Records and permanent failures of a scrape; every input URL lands in exactly one.
#[derive(Debug)]
pub struct Harvest<T> {
    pub records: Vec<T>,
    pub failures: Vec<FailedUrl>,
}

impl<T> Default for Harvest<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Harvest<T> {
    pub fn failed_urls(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.url.as_str())
    }

    /// Number of URLs accounted for.
    pub fn len(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sole owner of the result partition; workers only ever hold a sender.
pub struct Processor {
    progress: Arc<dyn Progress>,
}

impl Processor {
    pub fn new(progress: Arc<dyn Progress>) -> Self {
        Self { progress }
    }

    /// Drains outcomes until every sender is gone.
    pub async fn collect<T>(&self, outcomes: mpsc::Receiver<ScrapeOutcome<T>>, total: usize) -> Harvest<T> {
        let mut harvest = Harvest::default();
        let mut outcomes = ReceiverStream::new(outcomes);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                ScrapeOutcome::Success(record) => harvest.records.push(record),
                ScrapeOutcome::Failure(failure) => harvest.failures.push(failure),
            }
            self.progress.advance();
            log::debug!("{}/{} project pages done", harvest.len(), total);
        }

        self.progress.finish();
        harvest
    }
}
