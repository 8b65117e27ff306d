//! Built-in pipeline steps.

use async_trait::async_trait;
use tracing::{debug, error};

use super::{PipelineContext, PipelineStep};
use crate::error::{PipelineError, PipelineResult};

/// Rejects messages without a recipient, a subject, or content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationStep;

impl ValidationStep {
    pub fn new() -> Self {
        Self
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.is_empty())
}

#[async_trait]
impl PipelineStep for ValidationStep {
    fn name(&self) -> &str {
        "validation"
    }

    async fn execute(&self, context: PipelineContext) -> PipelineResult<PipelineContext> {
        let message = &context.message;

        if message.to.is_empty() {
            return Err(PipelineError::Validation(
                "Email recipient (To) is required".to_string(),
            ));
        }
        if message.subject.is_empty() {
            return Err(PipelineError::Validation(
                "Email subject is required".to_string(),
            ));
        }
        if is_blank(message.body.as_deref()) && is_blank(message.template_name.as_deref()) {
            return Err(PipelineError::Validation(
                "Either email body or template name must be provided".to_string(),
            ));
        }

        debug!(to = %message.to, "Email validation passed");
        Ok(context)
    }
}

/// Hands the message to the provider chosen for this send.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendingStep;

impl SendingStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStep for SendingStep {
    fn name(&self) -> &str {
        "sending"
    }

    async fn execute(&self, mut context: PipelineContext) -> PipelineResult<PipelineContext> {
        let provider = context
            .provider
            .clone()
            .ok_or(PipelineError::NoProviderSelected)?;

        debug!(provider = %provider.name(), "Sending email");
        let result = provider.send(&context.message).await;
        context.log(format!(
            "{}: {}",
            provider.name(),
            if result.success { "delivered" } else { "failed" }
        ));

        if !result.success {
            let reason = result.error.clone().unwrap_or_default();
            error!(provider = %provider.name(), error = %reason, "Failed to send email");
            return Err(PipelineError::Delivery(reason));
        }

        context.result = Some(result);
        Ok(context)
    }
}
