use super::pipeline_step::{PipelineStep, StepAction};
use crate::error::Error;

/// Runs steps in order over one context until they are done, one asks to skip the rest
/// or one aborts.
pub struct Pipeline<T> {
    pub steps: Vec<Box<dyn PipelineStep<T>>>,
}

impl<T: Send> Pipeline<T> {
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    pub async fn execute(&self, context: &mut T) -> Result<(), Error> {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::debug!("Step {} not needed, skipping it", step.name());
                continue;
            }

            tracing::debug!("Executing step: {}", step.name());

            match step.execute(context).await {
                StepAction::Continue => continue,
                StepAction::Skip => {
                    tracing::info!("Step {} requested skip - stopping pipeline", step.name());
                    return Ok(());
                }
                StepAction::Abort(error) => {
                    tracing::error!("Step {} aborted the pipeline: {}", step.name(), error);
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
