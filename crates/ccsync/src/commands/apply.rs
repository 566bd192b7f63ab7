//! `create` and `delete`: run a plan against the controller and render the
//! resulting report.

use std::fmt::Write as _;

use tabled::Tabled;
use tracing::info;

use ccsync_core::{Controller, OutcomeState, ResourceOutcome, RunReport};

use crate::cli::{DeleteArgs, GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn outcome_detail(outcome: &ResourceOutcome) -> String {
    match &outcome.state {
        OutcomeState::Failed {
            kind,
            detail,
            phase,
        } => format!("{kind} during {phase}: {detail}"),
        OutcomeState::SkippedDependencyFailed { blocked_by } => format!(
            "blocked by {}",
            blocked_by
                .iter()
                .map(util::resource_label)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        OutcomeState::Skipped => "already in desired state".into(),
        OutcomeState::Done | OutcomeState::NotAttempted => {
            outcome.task_id.clone().unwrap_or_default()
        }
    }
}

fn render_report(report: &RunReport, color: bool) -> String {
    let rows: Vec<OutcomeRow> = report
        .outcomes
        .values()
        .enumerate()
        .map(|(i, o)| OutcomeRow {
            step: i + 1,
            kind: o.key.kind().to_string(),
            resource: util::resource_label(&o.key),
            state: output::paint_state(&o.state, color),
            detail: outcome_detail(o),
        })
        .collect();

    let mut out = String::new();
    if !rows.is_empty() {
        out.push_str(&output::render_table(&rows));
        out.push('\n');
    }

    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or_default();
    let _ = write!(
        out,
        "{}: {} done, {} skipped, {} failed, {} blocked, {} not attempted ({:.1}s)",
        report.status,
        report.count(|s| matches!(s, OutcomeState::Done)),
        report.count(|s| matches!(s, OutcomeState::Skipped)),
        report.count(|s| matches!(s, OutcomeState::Failed { .. })),
        report.count(|s| matches!(s, OutcomeState::SkippedDependencyFailed { .. })),
        report.count(|s| matches!(s, OutcomeState::NotAttempted)),
        elapsed.as_secs_f64(),
    );
    if let Some(ref reason) = report.abort_reason {
        let _ = write!(out, "\naborted: {reason}");
    }
    out
}

fn finish(report: &RunReport, global: &GlobalOpts) -> Result<(), CliError> {
    info!(run_id = %report.run_id, status = %report.status, "run finished");
    let color = output::should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        report,
        |r| render_report(r, color),
        |r| {
            r.outcomes
                .values()
                .map(|o| format!("{}\t{}", util::resource_label(&o.key), o.state.label()))
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&rendered, global.quiet);

    CliError::from_report(report).map_or(Ok(()), Err)
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn create(
    controller: &Controller,
    args: &ManifestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let desired = util::load_manifest(&args.manifest)?;
    let report = controller.create(&desired).await?;
    finish(&report, global)
}

pub async fn delete(
    controller: &Controller,
    args: &DeleteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let desired = util::load_manifest(&args.manifest.manifest)?;

    // Reject bad input before asking anything.
    let plan = controller.plan(&desired, ccsync_core::Operation::Delete)?;

    let prompt = format!(
        "Delete {} resource(s) from {}?",
        plan.len(),
        controller.config().url
    );
    if !util::confirm(&prompt, "delete", args.force || global.yes)? {
        if !global.quiet {
            eprintln!("Nothing deleted.");
        }
        return Ok(());
    }

    let report = controller.delete(&desired, true).await?;
    finish(&report, global)
}
