use std::fmt;

use serde::{Deserialize, Serialize};

use super::context::WorkflowContext;
use super::retry::{RetryDecision, RetryPolicy};
use super::stage::Stage;
use crate::error::WorkflowError;
use crate::events::{Event, Status};

/// States of the workflow state machine.
///
/// A run flows through: STAGE_0 → STAGE_1 → STAGE_2 → STAGE_3 → SUCCESS,
/// detouring through RETRY on every failed trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Stage(Stage),
    /// Transient: resolved immediately by the retry policy.
    Retry,
    Success,
    Failure,
}

impl State {
    pub const INITIAL: State = State::Stage(Stage::First);
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Stage(stage) => write!(f, "{stage}"),
            State::Retry => write!(f, "RETRY"),
            State::Success => write!(f, "SUCCESS"),
            State::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Something that happened to the running workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    TrialPassed { value: u32 },
    TrialFailed { value: u32 },
    Retry(RetryDecision),
}

/// The result of applying one input: the replacement state and context,
/// plus the events to emit, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: State,
    pub context: WorkflowContext,
    pub events: Vec<Event>,
    /// Set when the step entered `Retry`: how the policy wants it resolved.
    pub retry: Option<RetryDecision>,
}

/// Compute the next state for `state` given `input`.
///
/// - A passed trial appends the value and reports the unchanged retry count;
///   on the last stage it also reports `Success`. A value outside the
///   stage's range is not a pass and is rejected.
/// - A failed trial moves to `Retry`, counting the failure and carrying the
///   policy's decision in [`Step::retry`].
/// - `Retry` resolves to the first stage (results cleared) or to `Failure`.
/// - Terminal states accept nothing.
pub fn transition(
    state: State,
    context: WorkflowContext,
    input: Input,
    policy: &RetryPolicy,
) -> Result<Step, WorkflowError> {
    let step = match (state, input) {
        (State::Stage(stage), Input::TrialPassed { value }) if stage.accepts(value) => {
            let context = context.with_result(value);
            let mut events = vec![Event::RetryUpdate {
                count: context.retries,
            }];
            let state = match stage.next() {
                Some(next) => State::Stage(next),
                None => {
                    events.push(Event::Status(Status::Success));
                    State::Success
                }
            };
            Step {
                state,
                context,
                events,
                retry: None,
            }
        }
        (State::Stage(_), Input::TrialFailed { .. }) => {
            let (context, decision, event) = policy.on_failure(context);
            Step {
                state: State::Retry,
                context,
                events: vec![event],
                retry: Some(decision),
            }
        }
        (State::Retry, Input::Retry(RetryDecision::Restart)) => Step {
            state: State::INITIAL,
            context: context.restarted(),
            events: Vec::new(),
            retry: None,
        },
        (State::Retry, Input::Retry(RetryDecision::Terminate)) => Step {
            state: State::Failure,
            context,
            events: vec![Event::Status(Status::Failed)],
            retry: None,
        },
        (state, input) => return Err(WorkflowError::InvalidTransition { state, input }),
    };

    Ok(step)
}
