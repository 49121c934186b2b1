use std::time::Duration;

use async_std::channel::Sender;
use core_types::{CollectionRef, Entry, events::BulkEvent};
use remote_session::{ItemQuery, PageCursor, RemoteError, RemoteSession, ViewDefinition};

use crate::{
    error::Error,
    progress::{ProgressTracker, notify, percent_of},
    remote_call::call,
};

/// Substring the server puts into the message of a query refused for scanning too many
/// entries. Matching is case-insensitive and best effort: the server may word it
/// differently in the future, in which case the raw remote error is returned.
const THRESHOLD_SIGNATURE: &str = "threshold";

/// Map a failed page request to the error returned to the caller.
pub fn classify_page_error(err: RemoteError) -> Error {
    if err
        .message()
        .to_lowercase()
        .contains(THRESHOLD_SIGNATURE)
    {
        Error::ThresholdExceeded(err.message().to_string())
    } else {
        Error::RemoteCallFailed(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    Start,
    HasCursor(PageCursor),
    Done,
}

/// Walks a collection page by page, following the server issued cursor.
pub struct PageScanner<'a> {
    session: &'a dyn RemoteSession,
    collection: &'a CollectionRef,
    view: ViewDefinition,
    timeout: Option<Duration>,
    state: ScanState,
    pages: u32,
}

impl<'a> PageScanner<'a> {
    pub fn new(
        session: &'a dyn RemoteSession,
        collection: &'a CollectionRef,
        view: ViewDefinition,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            collection,
            view,
            timeout,
            state: ScanState::Start,
            pages: 0,
        }
    }

    /// Pages fetched so far
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Fetch the next page, `None` once the previous page came without a cursor.
    ///
    /// The first page is always requested, so an empty collection yields one empty page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Entry>>, Error> {
        let position = match std::mem::replace(&mut self.state, ScanState::Done) {
            ScanState::Start => None,
            ScanState::HasCursor(cursor) => Some(cursor),
            ScanState::Done => return Ok(None),
        };

        let query = ItemQuery::new(self.view.clone(), position);
        tracing::trace!(view = %query.view_xml(), "Requesting page");
        let page = call(
            self.timeout,
            "get_items",
            self.session.get_items(self.collection, &query),
        )
        .await
        .map_err(classify_page_error)?;

        self.pages += 1;
        if let Some(cursor) = page.next_cursor {
            self.state = ScanState::HasCursor(cursor);
        }
        tracing::debug!(
            page = self.pages,
            entries = page.entries.len(),
            more = !self.is_done(),
            "Fetched page"
        );
        Ok(Some(page.entries))
    }
}

/// Drain the scanner into one sequence in server order.
///
/// After every page the progress `percent_of(fetched, total)` is passed through `scale`
/// before it is reported.
pub(crate) async fn collect_pages<F>(
    scanner: &mut PageScanner<'_>,
    total: u64,
    tracker: &mut ProgressTracker,
    progress_tx: Option<&Sender<BulkEvent>>,
    scale: F,
) -> Result<Vec<Entry>, Error>
where
    F: Fn(u8) -> u8 + Send,
{
    let collection = scanner.collection.title.clone();
    let mut entries = Vec::new();

    while let Some(page) = scanner.next_page().await? {
        let page_len = page.len();
        entries.extend(page);
        notify(
            progress_tx,
            BulkEvent::PageFetched {
                collection: collection.clone(),
                page: scanner.pages(),
                entries: page_len,
            },
        )
        .await;
        let percent = tracker.advance(scale(percent_of(entries.len() as u64, total)));
        notify(
            progress_tx,
            BulkEvent::Progress {
                collection: collection.clone(),
                percent,
            },
        )
        .await;
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ListTemplate;
    use remote_session::{MockRemoteSession, RecordedCall};

    #[test]
    fn test_threshold_message_is_classified() {
        let err = classify_page_error(RemoteError::Server(
            "The attempted operation exceeds the list view THRESHOLD.".to_string(),
        ));
        assert!(matches!(err, Error::ThresholdExceeded(m) if m.contains("THRESHOLD")));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let raw = RemoteError::Transport("connection reset".to_string());
        assert_eq!(classify_page_error(raw.clone()), Error::RemoteCallFailed(raw));
    }

    #[async_std::test]
    async fn test_scanner_follows_cursor() {
        let mock = MockRemoteSession::new();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        mock.add_entries(&tasks, 5);
        let view = ViewDefinition::new().with_fields(["ID"]).with_row_limit(2);
        let mut scanner = PageScanner::new(&mock, &tasks, view, None);

        let mut sizes = Vec::new();
        while let Some(page) = scanner.next_page().await.unwrap() {
            sizes.push(page.len());
        }

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(scanner.pages(), 3);
        assert!(scanner.next_page().await.unwrap().is_none());

        let cursors: Vec<Option<String>> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::GetItems { cursor, .. } => Some(cursor),
                _ => None,
            })
            .collect();
        assert_eq!(
            cursors,
            vec![
                None,
                Some("Paged=TRUE&p_ID=2".to_string()),
                Some("Paged=TRUE&p_ID=4".to_string())
            ]
        );
    }

    #[async_std::test]
    async fn test_empty_collection_yields_one_empty_page() {
        let mock = MockRemoteSession::new();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        let view = ViewDefinition::new().with_fields(["ID"]).with_row_limit(10);
        let mut scanner = PageScanner::new(&mock, &tasks, view, None);

        assert_eq!(scanner.next_page().await.unwrap(), Some(Vec::new()));
        assert_eq!(scanner.next_page().await.unwrap(), None);
    }
}
