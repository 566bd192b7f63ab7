// ── Async task tracker ──
//
// Mutating calls return a task handle; the controller finishes the work
// in the background. The tracker polls execution status with capped
// exponential backoff until the task settles, the deadline passes, or
// the run is cancelled.

use std::sync::Arc;
use std::time::Duration;

use ccsync_api::{ExecutionPhase, TaskHandle};
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::ControllerApi;
use crate::backoff::calculate_backoff;
use crate::config::TaskPolicy;
use crate::error::CoreError;
use crate::model::ResourceKey;
use crate::session::{CallMode, SessionManager};

/// Lifecycle of a controller task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// A tracked controller task. Owned by the step that submitted it.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Execution id, or `None` when the controller answered synchronously.
    pub id: Option<String>,
    pub target: ResourceKey,
    pub state: TaskState,
    pub last_error: Option<String>,
    pub polls: u32,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

pub struct TaskTracker<A> {
    session: Arc<SessionManager<A>>,
    policy: TaskPolicy,
    cancel: CancellationToken,
}

impl<A: ControllerApi> TaskTracker<A> {
    pub fn new(
        session: Arc<SessionManager<A>>,
        policy: TaskPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            policy,
            cancel,
        }
    }

    /// Wait for `handle` to settle using the configured timeout.
    pub async fn await_handle(
        &self,
        handle: &TaskHandle,
        target: &ResourceKey,
    ) -> Result<Task, CoreError> {
        self.await_task(handle, target, self.policy.timeout).await
    }

    /// Poll `handle` until it succeeds, fails, or `timeout` elapses.
    ///
    /// A 404 on the status endpoint means the controller already purged a
    /// completed record and counts as success.
    pub async fn await_task(
        &self,
        handle: &TaskHandle,
        target: &ResourceKey,
        timeout: Duration,
    ) -> Result<Task, CoreError> {
        let started = Instant::now();
        let mut task = Task {
            id: handle.label().map(str::to_owned),
            target: target.clone(),
            state: TaskState::Pending,
            last_error: None,
            polls: 0,
            elapsed: Duration::ZERO,
        };

        if handle.is_synchronous() {
            debug!(target = %target, "synchronous completion");
            task.state = TaskState::Succeeded;
            return Ok(task);
        }

        let task_id = task.id.clone().unwrap_or_default();
        let deadline = started + timeout;
        let mut transient = 0_u32;
        let mut attempt = 0_u32;

        loop {
            task.polls += 1;
            let handle_ref = handle.clone();
            let polled = self
                .session
                .call(CallMode::Single, move |api, token| {
                    let handle = handle_ref.clone();
                    async move { api.execution_status(&token, &handle).await }
                })
                .await;

            match polled {
                Ok(None) => return Ok(settle(task, TaskState::Succeeded, started)),
                Ok(Some(status)) => match status.phase() {
                    ExecutionPhase::Succeeded => {
                        debug!(task_id, polls = task.polls, "task succeeded");
                        return Ok(settle(task, TaskState::Succeeded, started));
                    }
                    ExecutionPhase::Failed(reason) => {
                        warn!(task_id, %reason, "task failed");
                        return Err(CoreError::TaskFailed { task_id, reason });
                    }
                    ExecutionPhase::InProgress => {
                        task.state = TaskState::Running;
                        transient = 0;
                    }
                },
                Err(err) if err.is_not_found() => {
                    debug!(task_id, "execution record gone, treating as complete");
                    return Ok(settle(task, TaskState::Succeeded, started));
                }
                Err(err) if err.is_transient() => {
                    transient += 1;
                    task.last_error = Some(err.to_string());
                    if transient > self.policy.max_transient_retries {
                        return Err(err);
                    }
                    warn!(task_id, attempt = transient, error = %err, "status poll failed, retrying");
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CoreError::TaskTimeout {
                    task_id,
                    waited_secs: now.duration_since(started).as_secs(),
                });
            }

            let delay = calculate_backoff(
                attempt,
                self.policy.initial_interval,
                self.policy.max_interval,
            )
            .min(deadline - now);
            attempt = attempt.saturating_add(1);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(CoreError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn settle(mut task: Task, state: TaskState, started: Instant) -> Task {
    task.state = state;
    task.elapsed = started.elapsed();
    task
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}
