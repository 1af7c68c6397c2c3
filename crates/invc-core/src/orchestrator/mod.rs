//! TaskOrchestrator - background investigations with exactly-once delivery
//!
//! Every submission runs its tool invocation on its own tokio task. Outcomes
//! never touch presentation state from the background: each task sends one
//! typed completion message over a channel, and the update surface (the
//! thread that owns the orchestrator) drains that channel on its own turn and
//! runs the task's callback there.
//!
//! Architecture:
//! - `submit` registers the task and its callback on the surface, then spawns
//! - background task: invoke tool → catch panics → send one completion
//! - `pump` / `next_delivery` / `run_until_idle`: surface-side draining

use crate::error::{Error, Result};
use crate::tools::{ProcessInvoker, ToolInvoker, ToolSpec};
use crate::types::{AnalysisTarget, TaskId, TaskOutcome, TaskState};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Callback receiving a task's outcome on the update surface
pub type OutcomeCallback = Box<dyn FnOnce(TaskOutcome)>;

/// One user-initiated investigation run
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub target: AnalysisTarget,
    pub tool: ToolSpec,
    state: TaskState,
}

impl Task {
    fn new(target: AnalysisTarget, tool: ToolSpec) -> Self {
        Self {
            id: TaskId::new(),
            target,
            tool,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    fn transition(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidStateTransition(format!(
                "task {}: {} -> {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

/// Message from a background task to the update surface
#[derive(Debug)]
struct Completion {
    id: TaskId,
    outcome: TaskOutcome,
}

struct TrackedTask {
    task: Task,
    on_outcome: Option<OutcomeCallback>,
}

/// Schedules tool invocations and delivers their outcomes.
///
/// Owned by the update surface. Not `Send`: the callbacks it holds run there.
pub struct TaskOrchestrator {
    invoker: Arc<dyn ToolInvoker>,
    runtime: Handle,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    tasks: HashMap<TaskId, TrackedTask>,
}

impl TaskOrchestrator {
    /// Create an orchestrator that runs real processes on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self::with_invoker(runtime, Arc::new(ProcessInvoker))
    }

    pub fn with_invoker(runtime: Handle, invoker: Arc<dyn ToolInvoker>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            invoker,
            runtime,
            completions_tx,
            completions_rx,
            tasks: HashMap::new(),
        }
    }

    /// Start investigating `target` with `tool` in the background.
    ///
    /// Returns immediately. `on_outcome` runs exactly once, during a later
    /// `pump`, `next_delivery` or `run_until_idle` call on this orchestrator.
    pub fn submit<F>(&mut self, target: AnalysisTarget, tool: ToolSpec, on_outcome: F) -> TaskId
    where
        F: FnOnce(TaskOutcome) + 'static,
    {
        let mut task = Task::new(target, tool);
        let id = task.id;

        self.runtime.spawn(run_task(
            id,
            Arc::clone(&self.invoker),
            task.tool.clone(),
            task.target.clone(),
            self.completions_tx.clone(),
        ));

        if let Err(e) = task.transition(TaskState::Running) {
            warn!(task_id = %id, error = %e, "Unexpected task state");
        }
        info!(
            task_id = %id,
            kind = %task.target.kind(),
            program = %task.tool.program_name(),
            "Task submitted"
        );

        self.tasks.insert(
            id,
            TrackedTask {
                task,
                on_outcome: Some(Box::new(on_outcome)),
            },
        );
        id
    }

    /// State of a task that has not been delivered yet.
    pub fn state(&self, id: TaskId) -> Option<&TaskState> {
        self.tasks.get(&id).map(|t| t.task.state())
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id).map(|t| &t.task)
    }

    /// Number of tasks whose outcome has not been delivered yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Deliver every outcome that is already waiting, without blocking.
    ///
    /// Meant to be called from the surface's periodic tick. Returns the
    /// number of callbacks run.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.deliver(completion) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Wait for the next outcome and deliver it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_delivery(&mut self) -> Option<TaskId> {
        while !self.tasks.is_empty() {
            let completion = self.completions_rx.recv().await?;
            let id = completion.id;
            if self.deliver(completion) {
                return Some(id);
            }
        }
        None
    }

    /// Deliver outcomes until no task is in flight. Returns the number delivered.
    pub async fn run_until_idle(&mut self) -> usize {
        let mut delivered = 0;
        while self.next_delivery().await.is_some() {
            delivered += 1;
        }
        delivered
    }

    fn deliver(&mut self, completion: Completion) -> bool {
        let Completion { id, outcome } = completion;

        let Some(mut tracked) = self.tasks.remove(&id) else {
            warn!(task_id = %id, "Completion for unknown task");
            return false;
        };

        if let Err(e) = tracked.task.transition(TaskState::Completed(outcome.clone())) {
            warn!(task_id = %id, error = %e, "Unexpected task state");
        }

        let Some(on_outcome) = tracked.on_outcome.take() else {
            return false;
        };

        debug!(task_id = %id, outcome = outcome.name(), "Delivering outcome");

        // A failing handler must not stop delivery of other tasks
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(move || on_outcome(outcome))) {
            error!(
                task_id = %id,
                panic = %panic_message(panic.as_ref()),
                "Outcome handler panicked"
            );
        }
        true
    }
}

/// Background side of one task. Always sends exactly one completion.
async fn run_task(
    id: TaskId,
    invoker: Arc<dyn ToolInvoker>,
    tool: ToolSpec,
    target: AnalysisTarget,
    completions: UnboundedSender<Completion>,
) {
    let program = tool.program_name();

    // Inner task is the isolation boundary: a panic there surfaces as a JoinError
    let invocation = tokio::spawn(async move { invoker.invoke(&tool, &target).await });

    let outcome = match invocation.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic().as_ref());
            error!(task_id = %id, program = %program, panic = %message, "Task panicked");
            TaskOutcome::launch_failed(format!("Error running {}: {}", program, message))
        }
        Err(e) => {
            warn!(task_id = %id, program = %program, error = %e, "Task aborted");
            TaskOutcome::launch_failed(format!("Error running {}: {}", program, e))
        }
    };

    info!(task_id = %id, outcome = outcome.name(), "Task completed");

    if completions.send(Completion { id, outcome }).is_err() {
        debug!(task_id = %id, "Update surface gone, outcome dropped");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::thread::ThreadId;
    use std::time::Duration;
    use tokio::sync::{Barrier, Notify};

    fn url(value: &str) -> AnalysisTarget {
        AnalysisTarget::Url {
            value: value.to_string(),
        }
    }

    fn tool() -> ToolSpec {
        ToolSpec::new("/opt/tools/investigate_url.sh", Duration::from_secs(60))
    }

    fn echo(target: &AnalysisTarget) -> TaskOutcome {
        TaskOutcome::Success {
            stdout: target.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Echoes the target back, panicking for targets named "boom".
    struct EchoInvoker;

    #[async_trait]
    impl ToolInvoker for EchoInvoker {
        async fn invoke(&self, _tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
            if target.to_string() == "boom" {
                panic!("analysis exploded");
            }
            echo(target)
        }
    }

    /// Blocks until released.
    struct GatedInvoker(Arc<Notify>);

    #[async_trait]
    impl ToolInvoker for GatedInvoker {
        async fn invoke(&self, _tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
            self.0.notified().await;
            echo(target)
        }
    }

    /// Only completes once `n` invocations are running at the same time.
    struct BarrierInvoker(Arc<Barrier>);

    #[async_trait]
    impl ToolInvoker for BarrierInvoker {
        async fn invoke(&self, _tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
            self.0.wait().await;
            echo(target)
        }
    }

    /// Records the thread each invocation ran on.
    struct ThreadRecordingInvoker(Arc<Mutex<Vec<ThreadId>>>);

    #[async_trait]
    impl ToolInvoker for ThreadRecordingInvoker {
        async fn invoke(&self, _tool: &ToolSpec, target: &AnalysisTarget) -> TaskOutcome {
            self.0.lock().unwrap().push(std::thread::current().id());
            echo(target)
        }
    }

    fn collector() -> (Rc<RefCell<Vec<TaskOutcome>>>, impl Fn() -> Box<dyn FnOnce(TaskOutcome)>) {
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&outcomes);
        let make = move || {
            let sink = Rc::clone(&sink);
            Box::new(move |outcome: TaskOutcome| sink.borrow_mut().push(outcome)) as Box<dyn FnOnce(TaskOutcome)>
        };
        (outcomes, make)
    }

    #[tokio::test]
    async fn test_outcome_delivered_exactly_once() {
        let mut orchestrator = TaskOrchestrator::with_invoker(Handle::current(), Arc::new(EchoInvoker));
        let (outcomes, callback) = collector();

        let id = orchestrator.submit(url("https://example.com"), tool(), callback());
        assert_eq!(orchestrator.state(id), Some(&TaskState::Running));
        assert_eq!(orchestrator.in_flight(), 1);

        assert_eq!(orchestrator.run_until_idle().await, 1);
        assert_eq!(outcomes.borrow().len(), 1);
        assert_eq!(outcomes.borrow()[0], echo(&url("https://example.com")));

        // Nothing left to deliver, ever
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(orchestrator.pump(), 0);
        assert_eq!(orchestrator.next_delivery().await, None);
        assert_eq!(outcomes.borrow().len(), 1);
        assert_eq!(orchestrator.in_flight(), 0);
        assert!(orchestrator.state(id).is_none());
    }

    #[tokio::test]
    async fn test_submit_does_not_block_and_pump_is_non_blocking() {
        let gate = Arc::new(Notify::new());
        let mut orchestrator =
            TaskOrchestrator::with_invoker(Handle::current(), Arc::new(GatedInvoker(Arc::clone(&gate))));
        let (outcomes, callback) = collector();

        let id = orchestrator.submit(url("https://slow.example"), tool(), callback());

        // Tool is still running: pumping delivers nothing and returns at once
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(orchestrator.pump(), 0);
        assert!(outcomes.borrow().is_empty());
        assert_eq!(orchestrator.state(id), Some(&TaskState::Running));

        gate.notify_one();
        assert_eq!(orchestrator.next_delivery().await, Some(id));
        assert_eq!(outcomes.borrow().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_identical_submissions_run_independently() {
        let barrier = Arc::new(Barrier::new(2));
        let mut orchestrator =
            TaskOrchestrator::with_invoker(Handle::current(), Arc::new(BarrierInvoker(barrier)));
        let (outcomes, callback) = collector();

        let target = url("https://same.example");
        let first = orchestrator.submit(target.clone(), tool(), callback());
        let second = orchestrator.submit(target.clone(), tool(), callback());
        assert_ne!(first, second);

        // Each invocation waits for the other, so this only finishes if both run concurrently
        let delivered = tokio::time::timeout(Duration::from_secs(5), orchestrator.run_until_idle())
            .await
            .expect("tasks should not block each other");

        assert_eq!(delivered, 2);
        assert_eq!(*outcomes.borrow(), vec![echo(&target), echo(&target)]);
    }

    #[tokio::test]
    async fn test_panicking_invocation_is_isolated() {
        let mut orchestrator = TaskOrchestrator::with_invoker(Handle::current(), Arc::new(EchoInvoker));
        let (outcomes, callback) = collector();

        orchestrator.submit(url("boom"), tool(), callback());
        orchestrator.submit(url("https://fine.example"), tool(), callback());

        assert_eq!(orchestrator.run_until_idle().await, 2);

        let outcomes = outcomes.borrow();
        assert!(outcomes.contains(&echo(&url("https://fine.example"))));
        let failure = outcomes
            .iter()
            .find(|o| matches!(o, TaskOutcome::LaunchFailed { .. }))
            .expect("panicking task should report a launch failure");
        match failure {
            TaskOutcome::LaunchFailed { message } => assert!(message.contains("analysis exploded")),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_stop_other_deliveries() {
        let mut orchestrator = TaskOrchestrator::with_invoker(Handle::current(), Arc::new(EchoInvoker));
        let (outcomes, callback) = collector();

        orchestrator.submit(url("https://a.example"), tool(), |_| panic!("render failed"));
        orchestrator.submit(url("https://b.example"), tool(), callback());

        assert_eq!(orchestrator.run_until_idle().await, 2);
        assert_eq!(*outcomes.borrow(), vec![echo(&url("https://b.example"))]);
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_callbacks_run_on_update_surface() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut orchestrator = TaskOrchestrator::with_invoker(
            Handle::current(),
            Arc::new(ThreadRecordingInvoker(Arc::clone(&seen))),
        );
        let surface = std::thread::current().id();
        let delivered_on = Rc::new(RefCell::new(Vec::new()));

        for i in 0..4 {
            let delivered_on = Rc::clone(&delivered_on);
            orchestrator.submit(url(&format!("https://{}.example", i)), tool(), move |_| {
                delivered_on.borrow_mut().push(std::thread::current().id());
            });
        }
        orchestrator.run_until_idle().await;

        assert_eq!(*delivered_on.borrow(), vec![surface; 4]);
        let invoked_on = seen.lock().unwrap();
        assert_eq!(invoked_on.len(), 4);
        assert!(invoked_on.iter().all(|t| *t != surface));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_process_delivers_single_timeout() {
        let mut orchestrator = TaskOrchestrator::new(Handle::current());
        let (outcomes, callback) = collector();
        let slow = ToolSpec::new("/bin/sh", Duration::from_millis(200))
            .with_args(["-c", "echo started; sleep 30", "sh", "{target}"]);

        orchestrator.submit(url("https://slow.example"), slow, callback());
        orchestrator.run_until_idle().await;

        assert_eq!(*outcomes.borrow(), vec![TaskOutcome::TimedOut]);
    }

    #[test]
    fn test_task_rejects_invalid_transition() {
        let mut task = Task::new(url("https://example.com"), tool());
        assert!(matches!(
            task.transition(TaskState::Completed(TaskOutcome::TimedOut)),
            Err(Error::InvalidStateTransition(_))
        ));
        task.transition(TaskState::Running).unwrap();
        task.transition(TaskState::Completed(TaskOutcome::TimedOut)).unwrap();
        assert!(matches!(task.state(), TaskState::Completed(TaskOutcome::TimedOut)));
    }
}
