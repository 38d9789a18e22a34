use thiserror::Error;

use crate::state_machine::{Input, Stage, State};

#[derive(Debug, Error)]
pub enum BoxflowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The client side of a session went away; events can no longer be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transport closed")]
pub struct TransportClosed;

/// Failure of a single trial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    /// Sampled value fell outside the stage's acceptance range.
    #[error("Value {value} out of range [{min}-{max}] for {stage}")]
    OutOfRange {
        stage: Stage,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error(transparent)]
    Transport(#[from] TransportClosed),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Invalid transition: {input:?} is not accepted in state {state}")]
    InvalidTransition { state: State, input: Input },

    #[error(transparent)]
    Transport(#[from] TransportClosed),
}

/// An inbound frame that could not be decoded.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed inbound message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display() {
        let err = TrialError::OutOfRange {
            stage: Stage::Second,
            value: 80,
            min: 25,
            max: 50,
        };
        assert_eq!(err.to_string(), "Value 80 out of range [25-50] for STAGE_1");
    }

    #[test]
    fn transport_closed_converts_into_trial_and_workflow_errors() {
        let trial: TrialError = TransportClosed.into();
        assert_eq!(trial, TrialError::Transport(TransportClosed));

        let workflow: WorkflowError = TransportClosed.into();
        assert_eq!(workflow.to_string(), "transport closed");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BoxflowError>();
        assert_send_sync::<WorkflowError>();
    }
}
