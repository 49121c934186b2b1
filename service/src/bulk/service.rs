use std::sync::Arc;

use async_std::channel::Sender;
use core_types::{CollectionRef, Entry, events::BulkEvent};
use remote_session::{RemoteSession, ViewDefinition};

use crate::{
    bulk::{
        context::MatchingDeletionContext,
        deletion::ReverseDeleter,
        options::{DeleteOptions, DeleteSummary, FetchOptions},
        scanner::{PageScanner, collect_pages},
    },
    error::{Error, require_non_empty},
    pipeline::Pipeline,
    progress::{ProgressTracker, notify, percent_of},
    remote_call::call,
    settings::Settings,
};

/// Enumerates and deletes whole collections page by page.
///
/// All calls of one operation go through the same session one after the other: each
/// page request needs the cursor returned by the previous one.
pub struct BulkService {
    session: Arc<dyn RemoteSession>,
    settings: Arc<Settings>,
}

impl BulkService {
    pub fn new(session: Arc<dyn RemoteSession>, settings: Arc<Settings>) -> Self {
        Self { session, settings }
    }

    /// Fetch every entry with only `view_fields` loaded, using the configured page size.
    pub async fn fetch_all(
        &self,
        collection: &CollectionRef,
        view_fields: &[&str],
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<Vec<Entry>, Error> {
        let options = FetchOptions::fields(view_fields.iter().copied(), self.settings.page_row_limit);
        self.fetch_all_with(collection, &options, progress_tx).await
    }

    /// Fetch every entry with the `ID` and `Title` fields.
    pub async fn fetch_all_default(
        &self,
        collection: &CollectionRef,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<Vec<Entry>, Error> {
        let options = FetchOptions::from(self.settings.as_ref());
        self.fetch_all_with(collection, &options, progress_tx).await
    }

    /// Fetch every entry the view yields, in server order.
    ///
    /// A query the server refuses for exceeding its view threshold fails with
    /// `Error::ThresholdExceeded`; any other failure is returned unchanged.
    #[tracing::instrument(skip_all, fields(collection = %collection), err)]
    pub async fn fetch_all_with(
        &self,
        collection: &CollectionRef,
        options: &FetchOptions,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<Vec<Entry>, Error> {
        require_non_empty(&collection.title, "collection title")?;
        options.validate()?;

        let result = self.run_fetch(collection, options, progress_tx).await;
        self.report_outcome(collection, &result, progress_tx).await;
        let entries = result?;
        tracing::info!(entries = entries.len(), "Fetched collection");
        Ok(entries)
    }

    async fn run_fetch(
        &self,
        collection: &CollectionRef,
        options: &FetchOptions,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<Vec<Entry>, Error> {
        let total = self.start(collection, progress_tx).await?;
        let mut tracker = ProgressTracker::new();
        let mut scanner = PageScanner::new(
            self.session.as_ref(),
            collection,
            options.view_definition(),
            self.settings.remote_call_timeout,
        );

        let entries =
            collect_pages(&mut scanner, total, &mut tracker, progress_tx, |percent| percent).await?;

        self.finish_progress(collection, &mut tracker, progress_tx)
            .await;
        Ok(entries)
    }

    /// Delete every entry with the configured batch and page sizes.
    pub async fn delete_all(
        &self,
        collection: &CollectionRef,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<DeleteSummary, Error> {
        let options = DeleteOptions::from(self.settings.as_ref());
        self.delete_all_with(collection, &options, progress_tx).await
    }

    /// Delete every entry, one page at a time: fetch a page of ids, delete it last to
    /// first, then fetch the next page.
    ///
    /// Not transactional. A failure leaves the entries deleted so far deleted; calling
    /// again continues with what is left.
    #[tracing::instrument(skip_all, fields(collection = %collection), err)]
    pub async fn delete_all_with(
        &self,
        collection: &CollectionRef,
        options: &DeleteOptions,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<DeleteSummary, Error> {
        require_non_empty(&collection.title, "collection title")?;
        options.validate()?;

        let result = self.run_delete_all(collection, options, progress_tx).await;
        self.report_outcome(collection, &result, progress_tx).await;
        let summary = result?;
        tracing::info!(
            deleted = summary.deleted,
            pages = summary.pages,
            commits = summary.commits,
            "Deleted collection entries"
        );
        Ok(summary)
    }

    async fn run_delete_all(
        &self,
        collection: &CollectionRef,
        options: &DeleteOptions,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<DeleteSummary, Error> {
        let total = self.start(collection, progress_tx).await?;
        let timeout = self.settings.remote_call_timeout;
        let view = ViewDefinition::new()
            .with_fields(["ID"])
            .with_row_limit(options.row_limit);
        let mut scanner = PageScanner::new(self.session.as_ref(), collection, view, timeout);
        let mut deleter =
            ReverseDeleter::new(self.session.as_ref(), collection, options.batch_limit, timeout);
        let mut tracker = ProgressTracker::new();
        let mut fetched: u64 = 0;

        while let Some(page) = scanner.next_page().await? {
            fetched += page.len() as u64;
            notify(
                progress_tx,
                BulkEvent::PageFetched {
                    collection: collection.title.clone(),
                    page: scanner.pages(),
                    entries: page.len(),
                },
            )
            .await;

            let fetch_percent = u16::from(percent_of(fetched, total));
            deleter
                .delete_page(&page, &mut tracker, progress_tx, |deleted| {
                    ((fetch_percent + u16::from(percent_of(deleted, total))) / 2) as u8
                })
                .await?;
        }

        self.finish_progress(collection, &mut tracker, progress_tx)
            .await;
        Ok(DeleteSummary {
            pages: scanner.pages(),
            deleted: deleter.deleted(),
            commits: deleter.commits(),
        })
    }

    /// Delete every entry matching `view`: fetch all of them first, then delete the
    /// whole sequence last to first. Fetching and deleting each take half of the
    /// reported progress.
    #[tracing::instrument(skip_all, fields(collection = %collection), err)]
    pub async fn delete_matching(
        &self,
        collection: &CollectionRef,
        view: ViewDefinition,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<DeleteSummary, Error> {
        let mut context = MatchingDeletionContext::new(
            self.session.clone(),
            collection.clone(),
            FetchOptions::custom(view, self.settings.page_row_limit),
            self.settings.delete_batch_limit,
            self.settings.remote_call_timeout,
            progress_tx.cloned(),
        );

        let pipeline = Pipeline::<MatchingDeletionContext>::new();
        let result = match pipeline.execute(&mut context).await {
            Ok(()) => {
                self.finish_progress(collection, &mut context.tracker, progress_tx)
                    .await;
                Ok(context.summary)
            }
            Err(e) => Err(e),
        };
        self.report_outcome(collection, &result, progress_tx).await;
        let summary = result?;
        tracing::info!(
            deleted = summary.deleted,
            commits = summary.commits,
            "Deleted matching entries"
        );
        Ok(summary)
    }

    /// Count the collection and announce the operation. The count is the progress
    /// denominator.
    async fn start(
        &self,
        collection: &CollectionRef,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) -> Result<u64, Error> {
        let total = call(
            self.settings.remote_call_timeout,
            "item_count",
            self.session.item_count(collection),
        )
        .await?;
        tracing::info!(total, "Starting bulk operation");
        notify(
            progress_tx,
            BulkEvent::Started {
                collection: collection.title.clone(),
                total_entries: total,
            },
        )
        .await;
        Ok(total)
    }

    async fn finish_progress(
        &self,
        collection: &CollectionRef,
        tracker: &mut ProgressTracker,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) {
        notify(
            progress_tx,
            BulkEvent::Progress {
                collection: collection.title.clone(),
                percent: tracker.finish(),
            },
        )
        .await;
    }

    async fn report_outcome<T>(
        &self,
        collection: &CollectionRef,
        result: &Result<T, Error>,
        progress_tx: Option<&Sender<BulkEvent>>,
    ) {
        let event = match result {
            Ok(_) => BulkEvent::Completed {
                collection: collection.title.clone(),
            },
            Err(e) => {
                tracing::error!("Bulk operation on '{}' failed: {}", collection, e);
                BulkEvent::Failed {
                    collection: collection.title.clone(),
                    error: e.to_string(),
                }
            }
        };
        notify(progress_tx, event).await;
    }
}
