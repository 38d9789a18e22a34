//! Per-connection state: one sink, at most one running workflow.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::events::{ChannelSink, Event, EventSink, Status};
use crate::orchestrator::WorkflowController;
use crate::protocol::{Inbound, Outbound};
use crate::trial::{RandomSampler, Sampler, TrialGenerator};

/// Builds a fresh sampler for each run.
pub type SamplerFactory = Arc<dyn Fn() -> Box<dyn Sampler> + Send + Sync>;

/// How runs started by a session behave.
#[derive(Clone)]
pub struct WorkflowSettings {
    pub latency: Duration,
    pub samplers: SamplerFactory,
}

impl WorkflowSettings {
    /// Entropy-seeded random samples with the given trial latency.
    pub fn random(latency: Duration) -> Self {
        Self {
            latency,
            samplers: Arc::new(|| -> Box<dyn Sampler> { Box::new(RandomSampler::from_entropy()) }),
        }
    }

    #[cfg(test)]
    pub fn with_samplers(latency: Duration, samplers: SamplerFactory) -> Self {
        Self { latency, samplers }
    }
}

/// One connected client.
///
/// Dropping the session aborts the in-flight run, so a pending trial never
/// outlives the connection.
pub struct Session {
    id: String,
    sink: ChannelSink,
    settings: WorkflowSettings,
    run: Option<JoinHandle<()>>,
}

impl Session {
    /// Create the session and greet the client with `Ready`.
    pub fn open(sink: ChannelSink, settings: WorkflowSettings) -> Self {
        let session = Self {
            id: Uuid::new_v4().to_string(),
            sink,
            settings,
            run: None,
        };
        info!(session_id = %session.id, "client connected");
        if session.sink.emit(Event::Status(Status::Ready)).is_err() {
            debug!(session_id = %session.id, "client gone before ready");
        }
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a run has been started and has not finished yet.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.is_finished())
    }

    /// Decode and handle one text frame. Malformed frames are logged and dropped.
    pub fn handle_text(&mut self, text: &str) {
        debug!(session_id = %self.id, message = %text, "received");
        match Inbound::parse(text) {
            Ok(message) => self.handle(message),
            Err(e) => warn!(session_id = %self.id, error = %e, "error handling message"),
        }
    }

    pub fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::StartWorkflow => self.start_workflow(),
            Inbound::HandleInVm => self.reply(Outbound::ApplyActions),
            Inbound::DoneFromVm => self.reply(Outbound::DoneFromVm),
            Inbound::Unknown => debug!(session_id = %self.id, "ignoring unknown message type"),
        }
    }

    /// Tear the session down, cancelling any pending trial.
    pub fn close(mut self) {
        self.cancel_run();
        info!(session_id = %self.id, "client disconnected");
    }

    fn reply(&self, message: Outbound) {
        if self.sink.send(message).is_err() {
            debug!(session_id = %self.id, ?message, "dropping reply to closed client");
        }
    }

    fn start_workflow(&mut self) {
        if self.cancel_run() {
            info!(session_id = %self.id, "replacing in-flight workflow");
        }
        // Acknowledged here, not inside the task, so it stays in order with
        // replies to frames that arrive right after the START.
        if self.sink.emit(Event::Status(Status::Running)).is_err() {
            debug!(session_id = %self.id, "client gone before run started");
            return;
        }

        let trials = TrialGenerator::new((self.settings.samplers)(), self.settings.latency);
        let controller = WorkflowController::new(self.sink.clone(), trials);
        let span = info_span!("workflow", session_id = %self.id, run_id = %controller.run_id());

        let task = async move {
            match controller.run().await {
                Ok(report) => debug!(duration_ms = report.duration_ms, "run report ready"),
                Err(WorkflowError::Transport(_)) => debug!("client gone, run abandoned"),
                Err(e) => error!(error = %e, "workflow aborted"),
            }
        };
        self.run = Some(tokio::spawn(task.instrument(span)));
    }

    /// Abort the current run, if any. Returns whether one was still going.
    fn cancel_run(&mut self) -> bool {
        match self.run.take() {
            Some(run) => {
                let was_running = !run.is_finished();
                run.abort();
                was_running
            }
            None => false,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::ScriptedSampler;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::mpsc::error::TryRecvError;

    fn scripted(latency: Duration, values: Vec<u32>) -> WorkflowSettings {
        WorkflowSettings::with_samplers(
            latency,
            Arc::new(move || -> Box<dyn Sampler> { Box::new(ScriptedSampler::new(values.clone())) }),
        )
    }

    fn open(settings: WorkflowSettings) -> (Session, UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::open(ChannelSink::new(tx), settings), rx)
    }

    async fn collect_until_terminal(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            let done = matches!(
                message,
                Outbound::StatusUpdate {
                    status: Status::Success | Status::Failed
                }
            );
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }

    #[tokio::test]
    async fn open_sends_ready() {
        let (session, mut rx) = open(scripted(Duration::ZERO, vec![10]));
        assert_eq!(
            rx.recv().await,
            Some(Outbound::StatusUpdate { status: Status::Ready })
        );
        assert!(!session.is_running());
        assert!(!session.id().is_empty());
    }

    #[tokio::test]
    async fn passthrough_messages_are_answered() {
        let (mut session, mut rx) = open(scripted(Duration::ZERO, vec![10]));
        rx.recv().await;

        session.handle_text(r#"{"type":"HANDLE_IN_VM"}"#);
        session.handle_text(r#"{"type":"DONE_FROM_VM"}"#);
        assert_eq!(rx.recv().await, Some(Outbound::ApplyActions));
        assert_eq!(rx.recv().await, Some(Outbound::DoneFromVm));
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages_change_nothing() {
        let (mut session, mut rx) = open(scripted(Duration::ZERO, vec![10]));
        rx.recv().await;

        session.handle_text("{not json");
        session.handle_text(r#"{"type":"SOMETHING_ELSE"}"#);
        assert!(!session.is_running());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        session.handle_text(r#"{"type":"HANDLE_IN_VM"}"#);
        assert_eq!(rx.recv().await, Some(Outbound::ApplyActions));
    }

    #[tokio::test]
    async fn start_runs_workflow_to_success() {
        let (mut session, mut rx) = open(scripted(Duration::ZERO, vec![10, 30, 60, 90]));
        session.handle_text(r#"{"type":"START_WORKFLOW"}"#);

        let messages = collect_until_terminal(&mut rx).await;
        let mut expected = vec![
            Outbound::StatusUpdate { status: Status::Ready },
            Outbound::StatusUpdate { status: Status::Running },
        ];
        for (index, value) in [10, 30, 60, 90].into_iter().enumerate() {
            expected.push(Outbound::BoxUpdate { index, value });
            expected.push(Outbound::RetryUpdate { count: 0 });
        }
        expected.push(Outbound::StatusUpdate { status: Status::Success });
        assert_eq!(messages, expected);
    }

    #[tokio::test]
    async fn second_start_replaces_the_first_run() {
        let (mut session, mut rx) = open(scripted(Duration::ZERO, vec![10, 30, 60, 90]));
        session.handle(Inbound::StartWorkflow);
        session.handle(Inbound::StartWorkflow);
        assert!(session.is_running());

        let messages = collect_until_terminal(&mut rx).await;
        let running = messages
            .iter()
            .filter(|m| matches!(m, Outbound::StatusUpdate { status: Status::Running }))
            .count();
        assert_eq!(running, 2);
        assert_eq!(
            messages[..4],
            [
                Outbound::StatusUpdate { status: Status::Ready },
                Outbound::StatusUpdate { status: Status::Running },
                Outbound::StatusUpdate { status: Status::Running },
                Outbound::BoxUpdate { index: 0, value: 10 },
            ]
        );

        tokio::task::yield_now().await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn running_is_ordered_before_later_replies() {
        let (mut session, mut rx) = open(scripted(Duration::ZERO, vec![10, 30, 60, 90]));
        session.handle_text(r#"{"type":"START_WORKFLOW"}"#);
        session.handle_text(r#"{"type":"HANDLE_IN_VM"}"#);
        session.handle_text(r#"{"type":"START_WORKFLOW"}"#);

        let messages = collect_until_terminal(&mut rx).await;
        let mut expected = vec![
            Outbound::StatusUpdate { status: Status::Ready },
            Outbound::StatusUpdate { status: Status::Running },
            Outbound::ApplyActions,
            Outbound::StatusUpdate { status: Status::Running },
        ];
        for (index, value) in [10, 30, 60, 90].into_iter().enumerate() {
            expected.push(Outbound::BoxUpdate { index, value });
            expected.push(Outbound::RetryUpdate { count: 0 });
        }
        expected.push(Outbound::StatusUpdate { status: Status::Success });
        assert_eq!(messages, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_discards_pending_trial() {
        let (mut session, mut rx) = open(scripted(Duration::from_secs(60), vec![10]));
        session.handle(Inbound::StartWorkflow);

        assert_eq!(
            rx.recv().await,
            Some(Outbound::StatusUpdate { status: Status::Ready })
        );
        assert_eq!(
            rx.recv().await,
            Some(Outbound::StatusUpdate { status: Status::Running })
        );
        assert_eq!(rx.recv().await, Some(Outbound::BoxUpdate { index: 0, value: 10 }));

        session.close();
        // Every sender is gone once the aborted run is dropped; no verdict follows.
        assert_eq!(rx.recv().await, None);
    }
}
