use async_std::channel::Sender;

/// Integer percentage of `done` out of `total`, capped at 100.
///
/// An empty total counts as 1, so an empty collection stays at 0 until the operation
/// forces the final 100.
pub fn percent_of(done: u64, total: u64) -> u8 {
    (done.saturating_mul(100) / total.max(1)).min(100) as u8
}

/// Keeps reported progress non-decreasing and ends it at exactly 100.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value to report for a checkpoint computed as `percent`.
    pub fn advance(&mut self, percent: u8) -> u8 {
        let next = self.last.unwrap_or(0).max(percent.min(100));
        self.last = Some(next);
        next
    }

    /// Like `advance`, but `None` when the reported value would not change.
    pub fn advance_if_changed(&mut self, percent: u8) -> Option<u8> {
        let previous = self.last;
        let next = self.advance(percent);
        (previous != Some(next)).then_some(next)
    }

    pub fn finish(&mut self) -> u8 {
        self.last = Some(100);
        100
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Send an event if anyone listens. A dropped receiver is not an error.
pub(crate) async fn notify<E>(progress_tx: Option<&Sender<E>>, event: E) {
    if let Some(tx) = progress_tx {
        tx.send(event).await.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(7, 3), 100);
    }

    #[test]
    fn test_tracker_never_decreases() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.advance(40), 40);
        assert_eq!(tracker.advance(10), 40);
        assert_eq!(tracker.advance(250), 100);
    }

    #[test]
    fn test_advance_if_changed() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.advance_if_changed(0), Some(0));
        assert_eq!(tracker.advance_if_changed(0), None);
        assert_eq!(tracker.advance_if_changed(5), Some(5));
        assert_eq!(tracker.advance_if_changed(3), None);
    }

    #[test]
    fn test_finish_forces_hundred() {
        let mut tracker = ProgressTracker::new();
        tracker.advance(99);
        assert_eq!(tracker.finish(), 100);
        assert_eq!(tracker.last(), Some(100));
    }

    #[async_std::test]
    async fn test_notify_without_listener() {
        notify::<u8>(None, 1).await;

        let (tx, rx) = async_std::channel::unbounded();
        drop(rx);
        notify(Some(&tx), 1u8).await;
    }
}
