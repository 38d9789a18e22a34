use serde::{Deserialize, Serialize};

use super::context::WorkflowContext;
use crate::events::Event;

/// Maximum cumulative trial failures tolerated over a whole run.
pub const RETRY_BUDGET: u32 = 20;

/// What to do after a trial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryDecision {
    /// Go back to the first stage with empty results.
    Restart,
    /// The budget is spent; the run fails.
    Terminate,
}

/// Bounds the number of failures a run may absorb.
///
/// The counter lives in [`WorkflowContext::retries`] and is shared by all
/// stages, so a late failure costs the same as an early one but also throws
/// away every result gathered since the last restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    budget: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: RETRY_BUDGET,
        }
    }
}

impl RetryPolicy {
    /// Count a failure and produce the `RetryUpdate` that reports it.
    pub fn record_failure(&self, context: WorkflowContext) -> (WorkflowContext, Event) {
        let context = context.with_failure();
        let event = Event::RetryUpdate {
            count: context.retries,
        };
        (context, event)
    }

    /// Restart while the budget has room, terminate once it is reached.
    pub fn decide(&self, context: &WorkflowContext) -> RetryDecision {
        if context.retries < self.budget {
            RetryDecision::Restart
        } else {
            RetryDecision::Terminate
        }
    }

    /// Record a failure and decide in one go.
    pub fn on_failure(&self, context: WorkflowContext) -> (WorkflowContext, RetryDecision, Event) {
        let (context, event) = self.record_failure(context);
        let decision = self.decide(&context);
        (context, decision, event)
    }
}
