//! Per-send pipeline context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::message::{EmailMessage, SendResult};
use crate::provider::EmailProvider;

/// State threaded through the pipeline for a single send.
///
/// Created per message and dropped once the pipeline finishes.
#[derive(Clone)]
pub struct PipelineContext {
    pub message: EmailMessage,
    pub provider: Option<Arc<dyn EmailProvider>>,
    pub result: Option<SendResult>,
    /// Free-form values steps use to talk to each other
    pub properties: HashMap<String, Value>,
    pub logs: Vec<String>,
}

impl PipelineContext {
    pub fn new(message: EmailMessage) -> Self {
        Self {
            message,
            provider: None,
            result: None,
            properties: HashMap::new(),
            logs: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn EmailProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Append a line to the context's log buffer.
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("to", &self.message.to)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("result", &self.result)
            .field("properties", &self.properties)
            .field("logs", &self.logs.len())
            .finish()
    }
}
