use crate::{
    bulk::{
        context::MatchingDeletionContext,
        steps::{CountEntriesStep, DeleteFetchedStep, FetchMatchingStep, ValidateOptionsStep},
    },
    pipeline::Pipeline,
};

impl Pipeline<MatchingDeletionContext> {
    pub fn new() -> Self {
        Self::with_steps(vec![
            Box::new(ValidateOptionsStep),
            Box::new(CountEntriesStep),
            Box::new(FetchMatchingStep),
            Box::new(DeleteFetchedStep),
        ])
    }
}
