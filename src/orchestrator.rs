use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{TrialError, WorkflowError};
use crate::events::EventSink;
use crate::state_machine::{Input, RetryPolicy, RunReport, Stage, State, WorkflowContext, transition};
use crate::trial::{Sampler, TrialGenerator};

/// Drives one run through the state machine, from the first stage to a
/// terminal state.
///
/// The controller owns its context and trial generator; events leave only
/// through the injected sink.
pub struct WorkflowController<S, R> {
    sink: S,
    trials: TrialGenerator<R>,
    policy: RetryPolicy,
    run_id: String,
}

impl<S: EventSink, R: Sampler> WorkflowController<S, R> {
    pub fn new(sink: S, trials: TrialGenerator<R>) -> Self {
        Self {
            sink,
            trials,
            policy: RetryPolicy::default(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run until `Success` or `Failure` and return the report.
    ///
    /// The caller acknowledges the start (`Status::Running`); the first event
    /// emitted here is the first stage's `BoxUpdate`.
    ///
    /// Returns `WorkflowError::Transport` as soon as the sink stops accepting
    /// events; the run is abandoned at that point.
    pub async fn run(mut self) -> Result<RunReport, WorkflowError> {
        let started_at = Utc::now();
        info!(run_id = %self.run_id, "starting workflow");

        let mut state = State::INITIAL;
        let mut context = WorkflowContext::new();
        let mut history = vec![state];
        let mut decision = None;

        loop {
            let input = match state {
                State::Stage(stage) => self.run_trial(stage).await?,
                State::Retry => Input::Retry(decision.take().unwrap_or_else(|| self.policy.decide(&context))),
                State::Success | State::Failure => break,
            };
            let step = transition(state, context, input, &self.policy)?;

            for event in &step.events {
                self.sink.emit(*event)?;
            }
            if step.state == State::Retry {
                info!(run_id = %self.run_id, retries = step.context.retries, "retry attempt {}", step.context.retries);
            }
            debug!(run_id = %self.run_id, from = %state, to = %step.state, "state transition");

            state = step.state;
            context = step.context;
            decision = step.retry;
            history.push(state);
        }

        let report = RunReport::new(self.run_id, &context, history, started_at);
        info!(
            run_id = %report.run_id,
            outcome = ?report.outcome,
            retries = report.retries,
            results = ?report.results,
            "workflow finished"
        );
        Ok(report)
    }

    /// Run the trial for `stage` and turn its verdict into an input.
    async fn run_trial(&mut self, stage: Stage) -> Result<Input, WorkflowError> {
        match self.trials.sample(stage, &self.sink).await {
            Ok(value) => Ok(Input::TrialPassed { value }),
            Err(TrialError::OutOfRange { value, .. }) => Ok(Input::TrialFailed { value }),
            Err(TrialError::Transport(closed)) => {
                warn!(run_id = %self.run_id, %stage, "sink closed mid-trial, abandoning run");
                Err(closed.into())
            }
        }
    }
}
