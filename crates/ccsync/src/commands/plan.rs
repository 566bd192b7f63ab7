//! `plan`: the ordered steps a `create` (or `delete`) would take. Offline.

use tabled::Tabled;

use ccsync_core::{Operation, PlanStep, ResourceGraph};

use crate::cli::{GlobalOpts, PlanArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Op")]
    operation: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "After")]
    after: String,
}

pub fn handle(args: &PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let desired = util::load_manifest(&args.manifest.manifest)?;
    let operation = if args.delete {
        Operation::Delete
    } else {
        Operation::Create
    };
    let plan = ResourceGraph::build(&desired)?.plan(operation)?;

    let steps = plan.steps();
    let position = |step: &PlanStep| {
        steps
            .iter()
            .position(|s| s.key == step.key)
            .map_or(0, |i| i + 1)
    };
    let rendered = output::render_list(
        &global.output,
        steps,
        |s| StepRow {
            step: position(s),
            operation: s.operation.to_string(),
            kind: s.key.kind().to_string(),
            resource: util::resource_label(&s.key),
            after: s
                .depends_on
                .iter()
                .filter_map(|dep| steps.iter().position(|o| &o.key == dep))
                .map(|i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join(", "),
        },
        |s| format!("{} {}", s.operation, util::resource_label(&s.key)),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
