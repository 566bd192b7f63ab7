// ── Run report ──
//
// One `ResourceOutcome` per plan step, in plan order, plus an overall
// status. The report is produced even when a run aborts.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::graph::{Operation, Plan};
use crate::model::ResourceKey;
use crate::reconciler::StepPhase;

/// Classification of a failure, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    CycleDetected,
    InvalidInput,
    ConfirmationRequired,
    AuthenticationFailed,
    Cancelled,
    TransientNetwork,
    TaskFailed,
    TaskTimeout,
    DependencyConflict,
    ValidationRejected,
    NotFound,
    Other,
}

/// Final state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutcomeState {
    /// The controller now matches the desired state for this resource.
    Done,
    /// Already in the desired state; nothing submitted.
    Skipped,
    Failed {
        kind: FailureKind,
        detail: String,
        /// Step phase at which the failure happened.
        phase: StepPhase,
    },
    /// A prerequisite failed or was itself skipped for that reason.
    SkippedDependencyFailed { blocked_by: Vec<ResourceKey> },
    /// The run aborted before reaching this step.
    NotAttempted,
}

impl OutcomeState {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Failed { .. } => "failed",
            Self::SkippedDependencyFailed { .. } => "blocked",
            Self::NotAttempted => "not attempted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    pub key: ResourceKey,
    pub state: OutcomeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ResourceOutcome {
    pub fn new(key: ResourceKey, state: OutcomeState) -> Self {
        Self {
            key,
            state,
            task_id: None,
            submitted_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    AllSucceeded,
    PartialFailure,
    Aborted,
}

/// Summary of one create or delete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub operation: Operation,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_kind: Option<FailureKind>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(serialize_with = "outcomes_in_order")]
    pub outcomes: IndexMap<ResourceKey, ResourceOutcome>,
}

impl RunReport {
    /// Start a report with every step `NotAttempted`.
    pub(crate) fn begin(plan: &Plan) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            operation: plan.operation(),
            status: RunStatus::AllSucceeded,
            abort_reason: None,
            abort_kind: None,
            started_at: now,
            finished_at: now,
            outcomes: plan
                .keys()
                .map(|k| {
                    (
                        k.clone(),
                        ResourceOutcome::new(k.clone(), OutcomeState::NotAttempted),
                    )
                })
                .collect(),
        }
    }

    pub(crate) fn abort(&mut self, kind: FailureKind, reason: String) {
        self.status = RunStatus::Aborted;
        self.abort_kind = Some(kind);
        self.abort_reason = Some(reason);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Utc::now();
        if self.status != RunStatus::Aborted
            && self.outcomes.values().any(|o| !o.state.is_ok())
        {
            self.status = RunStatus::PartialFailure;
        }
    }

    pub fn outcome(&self, key: &ResourceKey) -> Option<&ResourceOutcome> {
        self.outcomes.get(key)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::AllSucceeded
    }

    pub fn count(&self, pred: impl Fn(&OutcomeState) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(&o.state)).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes
            .values()
            .filter(|o| matches!(o.state, OutcomeState::Failed { .. }))
    }
}

fn outcomes_in_order<S: serde::Serializer>(
    outcomes: &IndexMap<ResourceKey, ResourceOutcome>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(outcomes.values())
}
