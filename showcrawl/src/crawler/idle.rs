/// Result of waiting for the listing to render more links after a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Grew,
    TimedOut,
}

/// Idle-round tracking for the scroll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    #[default]
    Progressing,
    /// Consecutive rounds without growth.
    Idle(u32),
}

impl ScrollState {
    /// Folds one scroll round into the state.
    ///
    /// `scan_grew` is whether harvesting before the scroll found unseen links;
    /// `wait` is what the DOM wait reported after the scroll. Either kind of
    /// growth resets the counter, and only a timed-out wait on a round whose scan
    /// found nothing counts as idle.
    pub fn advance(self, scan_grew: bool, wait: WaitOutcome) -> Self {
        match (scan_grew, wait) {
            (_, WaitOutcome::Grew) | (true, WaitOutcome::TimedOut) => ScrollState::Progressing,
            (false, WaitOutcome::TimedOut) => ScrollState::Idle(self.idle_rounds() + 1),
        }
    }

    pub fn idle_rounds(&self) -> u32 {
        match self {
            ScrollState::Progressing => 0,
            ScrollState::Idle(rounds) => *rounds,
        }
    }

    pub fn is_exhausted(&self, tolerance: u32) -> bool {
        self.idle_rounds() >= tolerance
    }
}
