//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod readings;
pub mod system;
pub mod util;
pub mod watch;

use sensorlink_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(dashboard, args, global).await,
        Command::Readings(args) => readings::list(dashboard, &args, global).await,
        Command::Chart(args) => readings::chart(dashboard, &args, global).await,
        Command::Watch(args) => watch::handle(dashboard, &args, global).await,
        Command::Health => system::health(dashboard, global).await,
        // Handled before a dashboard exists
        Command::Config(_) | Command::Completions(_) | Command::Login(_) | Command::Logout => {
            unreachable!()
        }
    }
}
