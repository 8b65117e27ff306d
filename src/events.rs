//! Async stream of delivery events.
//!
//! The send service can publish one `DeliveryEvent` per message so that
//! monitoring consumers can follow outcomes without polling the ledger.
//! Publishing never waits: events are dropped when the buffer is full or
//! the stream has been dropped.

use std::pin::Pin;

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Type alias for a boxed async stream of events.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Default channel capacity for event streams.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Outcome of one send attempt as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeliveryEvent {
    /// The provider accepted the message
    Delivered {
        provider: String,
        to: String,
        message_id: Option<String>,
    },
    /// The send reached a provider but failed
    Failed {
        provider: String,
        to: String,
        error: String,
    },
    /// No provider could be selected
    Unavailable { to: String, error: String },
}

/// A sender for events in an async stream.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> EventSender<T> {
    /// Create a new event sender from an mpsc sender.
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Try to send an event without waiting.
    ///
    /// Returns `Err(event)` if the channel is full or closed.
    pub fn try_send(&self, event: T) -> Result<(), T> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) => v,
            mpsc::error::TrySendError::Closed(v) => v,
        })
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Create an event stream with a specific buffer size.
///
/// # Example
///
/// ```rust
/// use mailroute::events::create_stream;
///
/// let (sender, _stream) = create_stream::<String>(16);
/// assert!(sender.try_send("queued".to_string()).is_ok());
/// ```
pub fn create_stream<T: Send + 'static>(buffer_size: usize) -> (EventSender<T>, EventStream<T>) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    let stream: EventStream<T> = Box::pin(ReceiverStream::new(rx));
    (EventSender::new(tx), stream)
}
