//! Send orchestrator.
//!
//! For each message: pick a provider, run the pipeline with it, report the
//! outcome to the provider manager. Nothing is retried.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::MailRouterResult;
use crate::events::{create_stream, DeliveryEvent, EventSender, EventStream, DEFAULT_BUFFER_SIZE};
use crate::manager::ProviderManager;
use crate::message::{EmailMessage, SendResult};
use crate::pipeline::{Pipeline, PipelineContext};

/// Routes messages through the provider manager and pipeline.
///
/// # Example
///
/// ```rust
/// use mailroute::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> MailRouterResult<()> {
/// let manager = ProviderManager::new(
///     vec![Arc::new(MockProvider::new("smtp"))],
///     ProviderOptions::new().with_provider(ProviderConfig::new("smtp", 1)),
/// )?;
/// let service = SendService::new(Arc::new(manager), Pipeline::standard());
///
/// let message = EmailMessage::builder()
///     .to("user@example.com")
///     .subject("Hello")
///     .body("Hi there")
///     .build();
/// let result = service.send(message).await?;
/// assert!(result.success);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SendService {
    manager: Arc<ProviderManager>,
    pipeline: Pipeline,
    events: Option<EventSender<DeliveryEvent>>,
}

impl SendService {
    pub fn new(manager: Arc<ProviderManager>, pipeline: Pipeline) -> Self {
        Self {
            manager,
            pipeline,
            events: None,
        }
    }

    /// Publish a `DeliveryEvent` for every send to the returned stream.
    pub fn with_event_stream(self) -> (Self, EventStream<DeliveryEvent>) {
        self.with_event_buffer(DEFAULT_BUFFER_SIZE)
    }

    /// Like `with_event_stream` with an explicit buffer size.
    pub fn with_event_buffer(mut self, buffer_size: usize) -> (Self, EventStream<DeliveryEvent>) {
        let (sender, stream) = create_stream(buffer_size);
        self.events = Some(sender);
        (self, stream)
    }

    pub fn manager(&self) -> &Arc<ProviderManager> {
        &self.manager
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Send one message.
    ///
    /// Returns the provider's result, or the first error raised while
    /// selecting a provider or running the pipeline. Pipeline errors are
    /// reported as failures of the selected provider before returning.
    pub async fn send(&self, message: EmailMessage) -> MailRouterResult<SendResult> {
        debug!(to = %message.to, "Sending email");
        let to = message.to.clone();

        let provider = match self.manager.get_next_provider() {
            Ok(provider) => provider,
            Err(err) => {
                error!(to = %to, error = %err, "No email provider available");
                self.publish(DeliveryEvent::Unavailable {
                    to,
                    error: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let context = PipelineContext::new(message).with_provider(Arc::clone(&provider));
        match self.pipeline.execute(context).await {
            Ok(result) => {
                if result.success {
                    self.manager.report_success(provider.as_ref());
                    info!(provider = %provider.name(), to = %to, "Email sent");
                    self.publish(DeliveryEvent::Delivered {
                        provider: provider.name().to_string(),
                        to,
                        message_id: result.message_id.clone(),
                    });
                } else {
                    self.manager.report_failure(provider.as_ref());
                    self.publish(DeliveryEvent::Failed {
                        provider: provider.name().to_string(),
                        to,
                        error: result.error.clone().unwrap_or_default(),
                    });
                }
                Ok(result)
            }
            Err(err) => {
                error!(provider = %provider.name(), to = %to, error = %err, "Failed to send email");
                self.manager.report_failure(provider.as_ref());
                self.publish(DeliveryEvent::Failed {
                    provider: provider.name().to_string(),
                    to,
                    error: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn publish(&self, event: DeliveryEvent) {
        if let Some(events) = &self.events {
            if events.try_send(event).is_err() {
                debug!("Delivery event dropped");
            }
        }
    }
}
