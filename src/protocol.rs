//! JSON messages exchanged with the browser client.
//!
//! Every frame is an object with a `type` tag and its payload fields next to
//! it, e.g. `{"type":"BOX_UPDATE","index":2,"value":61}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::events::{Event, Status};

/// Messages the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inbound {
    StartWorkflow,
    HandleInVm,
    DoneFromVm,
    /// Any other well-formed message. Ignored.
    #[serde(other)]
    Unknown,
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    StatusUpdate { status: Status },
    BoxUpdate { index: usize, value: u32 },
    RetryUpdate { count: u32 },
    ApplyActions,
    DoneFromVm,
}

impl From<Event> for Outbound {
    fn from(event: Event) -> Self {
        match event {
            Event::Status(status) => Outbound::StatusUpdate { status },
            Event::BoxUpdate { stage_index, value } => Outbound::BoxUpdate {
                index: stage_index,
                value,
            },
            Event::RetryUpdate { count } => Outbound::RetryUpdate { count },
        }
    }
}
