//! Command handlers, one module per verb.

pub mod apply;
pub mod plan;
pub mod status;
pub mod util;

use ccsync_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a controller-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Create(args) => apply::create(controller, &args, global).await,
        Command::Delete(args) => apply::delete(controller, &args, global).await,
        Command::Status(args) => status::handle(controller, &args, global).await,
        // Handled in main before a controller is built.
        Command::Plan(_) | Command::Completions(_) => Ok(()),
    }
}
