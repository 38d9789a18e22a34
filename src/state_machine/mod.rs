mod context;
mod retry;
mod stage;
mod state;

pub use context::{RunOutcome, RunReport, WorkflowContext};
pub use retry::{RETRY_BUDGET, RetryPolicy};
pub use stage::{SAMPLE_DOMAIN, Stage};
pub use state::{Input, State, transition};
