//! Ordered, composable processing of a message around dispatch.
//!
//! A `Pipeline` runs its steps strictly in registration order. Each step
//! receives the context returned by the previous one. The first error
//! aborts the run and is returned as-is; nothing is rolled back.
//!
//! ```rust
//! use mailroute::{Pipeline, SendingStep, ValidationStep};
//!
//! let pipeline = Pipeline::builder()
//!     .step(ValidationStep::new())
//!     .step(SendingStep::new())
//!     .build();
//! assert_eq!(pipeline.step_names(), vec!["validation", "sending"]);
//! ```

mod context;
mod steps;

pub use context::PipelineContext;
pub use steps::{SendingStep, ValidationStep};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{PipelineError, PipelineResult};
use crate::message::SendResult;

/// A single unit of per-message processing.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Step name used in logs.
    fn name(&self) -> &str;

    /// Process the context, returning it (possibly modified) for the next step.
    async fn execute(&self, context: PipelineContext) -> PipelineResult<PipelineContext>;
}

/// An ordered list of pipeline steps.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The default two-step pipeline: validation, then sending.
    pub fn standard() -> Self {
        Self::builder()
            .step(ValidationStep::new())
            .step(SendingStep::new())
            .build()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step and return the final context.
    pub async fn run(&self, mut context: PipelineContext) -> PipelineResult<PipelineContext> {
        for step in &self.steps {
            debug!(step = step.name(), "Executing pipeline step");
            context = step.execute(context).await.map_err(|err| {
                error!(step = step.name(), error = %err, "Pipeline step failed");
                err
            })?;
        }
        Ok(context)
    }

    /// Run every step and return the stored send result.
    pub async fn execute(&self, context: PipelineContext) -> PipelineResult<SendResult> {
        self.run(context)
            .await?
            .result
            .ok_or(PipelineError::MissingResult)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Builder for assembling a pipeline in order.
#[derive(Default)]
pub struct PipelineBuilder {
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append an already shared step.
    pub fn shared_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline { steps: self.steps }
    }
}
