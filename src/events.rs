//! Events emitted by a running workflow and the sinks that deliver them.

#[cfg(test)]
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::TransportClosed;
use crate::protocol::Outbound;

/// Coarse lifecycle status reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ready,
    // Deployed clients match on the lowercase spelling.
    #[serde(rename = "running")]
    Running,
    Success,
    Failed,
}

/// A progress or status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Status(Status),
    /// A trial drew `value` for the stage at `stage_index`.
    BoxUpdate { stage_index: usize, value: u32 },
    /// Current cumulative failure count.
    RetryUpdate { count: u32 },
}

/// Destination for workflow events.
///
/// Implementations must deliver events in the order `emit` is called.
pub trait EventSink: Send + Sync {
    /// Deliver one event, or report that nobody is listening any more.
    fn emit(&self, event: Event) -> Result<(), TransportClosed>;
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: Event) -> Result<(), TransportClosed> {
        (**self).emit(event)
    }
}

/// Forwards events to a connection's writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<Outbound>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Send a raw outbound message, including ones that are not workflow events.
    pub fn send(&self, message: Outbound) -> Result<(), TransportClosed> {
        self.tx.send(message).map_err(|_| TransportClosed)
    }

}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) -> Result<(), TransportClosed> {
        self.send(event.into())
    }
}

/// Keeps every event in memory. Used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: RwLock<Vec<Event>>,
    closed: RwLock<bool>,
}

#[cfg(test)]
impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Make every later `emit` fail as if the client disconnected.
    pub fn close(&self) {
        *self.closed.write() = true;
    }
}

#[cfg(test)]
impl EventSink for CollectingSink {
    fn emit(&self, event: Event) -> Result<(), TransportClosed> {
        if *self.closed.read() {
            return Err(TransportClosed);
        }
        self.events.write().push(event);
        Ok(())
    }
}
