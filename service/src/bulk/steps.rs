use core_types::events::BulkEvent;

use crate::{
    bulk::{
        context::MatchingDeletionContext,
        deletion::ReverseDeleter,
        scanner::{PageScanner, collect_pages},
    },
    error::Error,
    pipeline::{PipelineStep, StepAction},
    progress::{notify, percent_of},
    remote_call::call,
};

/// Step 1: reject bad options before anything is sent
pub struct ValidateOptionsStep;

#[async_trait::async_trait]
impl PipelineStep<MatchingDeletionContext> for ValidateOptionsStep {
    fn name(&self) -> &'static str {
        "validate_options"
    }

    async fn execute(&self, context: &mut MatchingDeletionContext) -> StepAction {
        if context.collection.title.trim().is_empty() {
            return StepAction::Abort(Error::PreconditionViolation(
                "collection title must not be empty".to_string(),
            ));
        }
        if context.batch_limit == 0 {
            return StepAction::Abort(Error::PreconditionViolation(
                "batch limit must be greater than zero".to_string(),
            ));
        }
        match context.fetch.validate() {
            Ok(()) => StepAction::Continue,
            Err(e) => StepAction::Abort(e),
        }
    }
}

/// Step 2: count the collection for the fetch progress denominator
pub struct CountEntriesStep;

#[async_trait::async_trait]
impl PipelineStep<MatchingDeletionContext> for CountEntriesStep {
    fn name(&self) -> &'static str {
        "count_entries"
    }

    async fn execute(&self, context: &mut MatchingDeletionContext) -> StepAction {
        let count = call(
            context.timeout,
            "item_count",
            context.session.item_count(&context.collection),
        )
        .await;

        match count {
            Ok(total) => {
                tracing::info!(total, "Collection '{}' counted", context.collection);
                context.total = total;
                notify(
                    context.progress_tx.as_ref(),
                    BulkEvent::Started {
                        collection: context.collection.title.clone(),
                        total_entries: total,
                    },
                )
                .await;
                StepAction::Continue
            }
            Err(e) => StepAction::Abort(e.into()),
        }
    }
}

/// Step 3: fetch every matching entry, the first half of the progress range
pub struct FetchMatchingStep;

#[async_trait::async_trait]
impl PipelineStep<MatchingDeletionContext> for FetchMatchingStep {
    fn name(&self) -> &'static str {
        "fetch_matching"
    }

    async fn execute(&self, context: &mut MatchingDeletionContext) -> StepAction {
        let mut scanner = PageScanner::new(
            context.session.as_ref(),
            &context.collection,
            context.fetch.view_definition(),
            context.timeout,
        );
        let fetched = collect_pages(
            &mut scanner,
            context.total,
            &mut context.tracker,
            context.progress_tx.as_ref(),
            |percent| percent / 2,
        )
        .await;
        let pages = scanner.pages();

        match fetched {
            Ok(entries) => {
                tracing::info!(
                    matching = entries.len(),
                    pages,
                    "Fetched entries to delete"
                );
                context.summary.pages = pages;
                context.entries = entries;
                StepAction::Continue
            }
            Err(e) => StepAction::Abort(e),
        }
    }
}

/// Step 4: delete the fetched sequence last to first, the second half of the progress range
pub struct DeleteFetchedStep;

#[async_trait::async_trait]
impl PipelineStep<MatchingDeletionContext> for DeleteFetchedStep {
    fn name(&self) -> &'static str {
        "delete_fetched"
    }

    fn should_execute(&self, context: &MatchingDeletionContext) -> bool {
        !context.entries.is_empty()
    }

    async fn execute(&self, context: &mut MatchingDeletionContext) -> StepAction {
        let to_delete = context.entries.len() as u64;
        let mut deleter = ReverseDeleter::new(
            context.session.as_ref(),
            &context.collection,
            context.batch_limit,
            context.timeout,
        );
        let result = deleter
            .delete_page(
                &context.entries,
                &mut context.tracker,
                context.progress_tx.as_ref(),
                |deleted| ((100 + u16::from(percent_of(deleted, to_delete))) / 2) as u8,
            )
            .await;
        context.summary.deleted = deleter.deleted();
        context.summary.commits = deleter.commits();

        match result {
            Ok(()) => StepAction::Continue,
            Err(e) => StepAction::Abort(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bulk::options::FetchOptions;
    use core_types::{CollectionRef, ListTemplate};
    use remote_session::{MockRemoteSession, RecordedCall};

    fn context(mock: &MockRemoteSession, collection: CollectionRef) -> MatchingDeletionContext {
        MatchingDeletionContext::new(
            Arc::new(mock.clone()),
            collection,
            FetchOptions::fields(["ID"], 10),
            3,
            None,
            None,
        )
    }

    #[async_std::test]
    async fn test_validate_rejects_zero_batch_limit() {
        let mock = MockRemoteSession::new();
        let mut ctx = context(&mock, CollectionRef::new("Tasks"));
        ctx.batch_limit = 0;

        let action = ValidateOptionsStep.execute(&mut ctx).await;

        assert!(matches!(
            action,
            StepAction::Abort(Error::PreconditionViolation(_))
        ));
        assert!(mock.calls().is_empty());
    }

    #[async_std::test]
    async fn test_count_step_stores_total() {
        let mock = MockRemoteSession::new();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        mock.add_entries(&tasks, 4);
        let mut ctx = context(&mock, tasks);

        assert_eq!(CountEntriesStep.execute(&mut ctx).await, StepAction::Continue);
        assert_eq!(ctx.total, 4);
    }

    #[async_std::test]
    async fn test_fetch_step_collects_all_pages() {
        let mock = MockRemoteSession::new();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        mock.add_entries(&tasks, 12);
        let mut ctx = context(&mock, tasks);
        ctx.total = 12;

        assert_eq!(FetchMatchingStep.execute(&mut ctx).await, StepAction::Continue);
        assert_eq!(ctx.entries.len(), 12);
        assert_eq!(ctx.summary.pages, 2);
        // fetch phase covers at most half of the range
        assert_eq!(ctx.tracker.last(), Some(50));
    }

    #[test]
    fn test_delete_step_is_skipped_without_entries() {
        let mock = MockRemoteSession::new();
        let ctx = context(&mock, CollectionRef::new("Tasks"));
        assert!(!DeleteFetchedStep.should_execute(&ctx));
    }

    #[async_std::test]
    async fn test_delete_step_deletes_in_reverse() {
        let mock = MockRemoteSession::new();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        let ids = mock.add_entries(&tasks, 4);
        let mut ctx = context(&mock, tasks.clone());
        FetchMatchingStep.execute(&mut ctx).await;
        mock.clear_calls();

        assert_eq!(DeleteFetchedStep.execute(&mut ctx).await, StepAction::Continue);

        let deleted: Vec<i64> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::QueueDelete { item_id, .. } => Some(item_id),
                _ => None,
            })
            .collect();
        let mut reversed = ids.clone();
        reversed.reverse();
        assert_eq!(deleted, reversed);
        assert_eq!(ctx.summary.deleted, 4);
        assert_eq!(ctx.tracker.last(), Some(100));
        assert_eq!(mock.entry_count(&tasks), 0);
    }
}
