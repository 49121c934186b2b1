use crate::error::Error;

/// What the pipeline does after a step returns.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Continue,
    /// Stop successfully without running the remaining steps
    Skip,
    Abort(Error),
}

/// One stage of a multi-step operation working on a shared context `T`.
///
/// A step reads its inputs from the context and stores its results there for the
/// steps that follow.
#[async_trait::async_trait]
pub trait PipelineStep<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checked right before `execute`. A step that returns `false` is passed over and
    /// the pipeline carries on with the next one.
    fn should_execute(&self, _context: &T) -> bool {
        true
    }

    async fn execute(&self, context: &mut T) -> StepAction;
}
