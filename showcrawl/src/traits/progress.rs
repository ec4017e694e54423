/// Observer for how many URLs have reached a terminal outcome.
pub trait Progress: Send + Sync {
    fn set_total(&self, _total: u64) {}
    fn advance(&self);
    fn finish(&self) {}
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self) {}
}
