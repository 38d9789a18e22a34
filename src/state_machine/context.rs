use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::State;

/// Run-scoped state threaded through the state machine.
///
/// Values are never mutated in place: each transition consumes the current
/// context and hands back its replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// Cumulative trial failures across the whole run.
    pub retries: u32,
    /// Accepted samples since the last restart, one per completed stage.
    pub results: Vec<u32>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted sample.
    pub fn with_result(mut self, value: u32) -> Self {
        self.results.push(value);
        self
    }

    /// Count one more trial failure. Results are untouched.
    pub fn with_failure(mut self) -> Self {
        self.retries += 1;
        self
    }

    /// Back to the first stage: results are dropped, retries are kept.
    pub fn restarted(mut self) -> Self {
        self.results.clear();
        self
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Success,
    Failed,
}

/// Summary produced when a run reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub retries: u32,
    pub results: Vec<u32>,
    pub state_transitions: Vec<State>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    /// Build a report from the final context and the visited states.
    ///
    /// `history` must end with the terminal state; anything else is reported
    /// as a failure.
    pub fn new(
        run_id: String,
        context: &WorkflowContext,
        history: Vec<State>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        let outcome = match history.last() {
            Some(State::Success) => RunOutcome::Success,
            _ => RunOutcome::Failed,
        };

        Self {
            run_id,
            outcome,
            retries: context.retries,
            results: context.results.clone(),
            state_transitions: history,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}
