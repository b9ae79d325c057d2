//! Backend health.

use sensorlink_core::{Dashboard, Health};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(h: &Health) -> String {
    if h.message.is_empty() {
        format!("Status:  {}", h.status)
    } else {
        format!("Status:  {}\nMessage: {}", h.status, h.message)
    }
}

/// `health`: print the probe; a non-healthy status fails the command.
pub async fn health(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let health = dashboard.health().await?;
    let out = output::render_single(global.output, &health, detail, |h| h.status.clone());
    output::print_output(&out, global.quiet);

    if health.is_healthy() {
        Ok(())
    } else {
        Err(CliError::ApiError {
            code: "unhealthy".into(),
            message: health.message,
        })
    }
}
