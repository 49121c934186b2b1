use std::{sync::Arc, time::Duration};

use async_std::channel::Sender;
use core_types::{CollectionRef, Entry, events::BulkEvent};
use remote_session::RemoteSession;

use crate::{
    bulk::options::{DeleteSummary, FetchOptions},
    progress::ProgressTracker,
};

/// Context object that flows through the fetch-then-delete pipeline
pub struct MatchingDeletionContext {
    pub session: Arc<dyn RemoteSession>,
    pub collection: CollectionRef,
    pub fetch: FetchOptions,
    pub batch_limit: usize,
    pub timeout: Option<Duration>,
    pub progress_tx: Option<Sender<BulkEvent>>,

    // Accumulated state as pipeline progresses
    pub tracker: ProgressTracker,
    pub total: u64,
    pub entries: Vec<Entry>,
    pub summary: DeleteSummary,
}

impl MatchingDeletionContext {
    pub fn new(
        session: Arc<dyn RemoteSession>,
        collection: CollectionRef,
        fetch: FetchOptions,
        batch_limit: usize,
        timeout: Option<Duration>,
        progress_tx: Option<Sender<BulkEvent>>,
    ) -> Self {
        Self {
            session,
            collection,
            fetch,
            batch_limit,
            timeout,
            progress_tx,
            tracker: ProgressTracker::new(),
            total: 0,
            entries: Vec::new(),
            summary: DeleteSummary::default(),
        }
    }
}
