use std::time::Duration;

use async_std::channel::Sender;
use core_types::{CollectionRef, Entry, events::BulkEvent};
use remote_session::RemoteSession;

use crate::{
    error::Error,
    progress::{ProgressTracker, notify},
    remote_call::call,
};

/// Deletes fetched entries last to first, committing the session every `batch_limit`
/// deletions and once more at the end of each page.
///
/// Commits happen while counting down: the deletion of index `i` is followed by a
/// commit whenever `i % batch_limit == 0`.
pub(crate) struct ReverseDeleter<'a> {
    session: &'a dyn RemoteSession,
    collection: &'a CollectionRef,
    batch_limit: usize,
    timeout: Option<Duration>,
    /// Deletions handed to the session, committed or not
    queued: u64,
    deleted: u64,
    commits: u32,
}

impl<'a> ReverseDeleter<'a> {
    pub fn new(
        session: &'a dyn RemoteSession,
        collection: &'a CollectionRef,
        batch_limit: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            collection,
            batch_limit: batch_limit.max(1),
            timeout,
            queued: 0,
            deleted: 0,
            commits: 0,
        }
    }

    /// Deletions the server confirmed with a commit.
    pub fn deleted(&self) -> u64 {
        self.deleted
    }

    pub fn commits(&self) -> u32 {
        self.commits
    }

    /// Delete one page. `percent_for` maps the running count of queued deletions to the
    /// overall progress; only changed values are reported.
    pub async fn delete_page<F>(
        &mut self,
        entries: &[Entry],
        tracker: &mut ProgressTracker,
        progress_tx: Option<&Sender<BulkEvent>>,
        percent_for: F,
    ) -> Result<(), Error>
    where
        F: Fn(u64) -> u8 + Send,
    {
        // nothing queued, nothing to commit
        if entries.is_empty() {
            return Ok(());
        }

        for (index, entry) in entries.iter().enumerate().rev() {
            self.session.queue_delete(self.collection, entry.id);
            self.queued += 1;
            if index % self.batch_limit == 0 {
                self.commit().await?;
            }
            if let Some(percent) = tracker.advance_if_changed(percent_for(self.queued)) {
                notify(
                    progress_tx,
                    BulkEvent::Progress {
                        collection: self.collection.title.clone(),
                        percent,
                    },
                )
                .await;
            }
        }
        self.commit().await?;

        tracing::debug!(
            page_entries = entries.len(),
            deleted = self.deleted,
            "Deleted page"
        );
        notify(
            progress_tx,
            BulkEvent::EntriesDeleted {
                collection: self.collection.title.clone(),
                deleted: self.deleted,
            },
        )
        .await;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Error> {
        call(self.timeout, "execute", self.session.execute()).await?;
        self.commits += 1;
        self.deleted = self.queued;
        Ok(())
    }
}
