//! Device command handlers.

use tabled::Tabled;

use sensorlink_core::{Dashboard, Device, DeviceCreate, DeviceId, DeviceUpdate};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Installed")]
    installed: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.get(),
            name: d.device_name.clone(),
            ip: d.ip_address.clone(),
            kind: d.kind.clone().unwrap_or_default(),
            installed: d
                .date_installed
                .as_ref()
                .map(util::format_timestamp)
                .unwrap_or_default(),
        }
    }
}

fn detail(d: &Device) -> String {
    let stamp = |ts: Option<&chrono::DateTime<chrono::Utc>>| {
        ts.map_or_else(|| "-".into(), util::format_timestamp)
    };
    [
        format!("ID:        {}", d.id),
        format!("Name:      {}", d.device_name),
        format!("IP:        {}", d.ip_address),
        format!("Type:      {}", output::or_dash(d.kind.as_deref())),
        format!("Installed: {}", stamp(d.date_installed.as_ref())),
        format!("Created:   {}", stamp(d.created_at.as_ref())),
        format!("Updated:   {}", stamp(d.updated_at.as_ref())),
    ]
    .join("\n")
}

fn print_device(device: &Device, global: &GlobalOpts) {
    let out = output::render_single(global.output, device, detail, |d| d.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(list) => {
            let devices = dashboard.list_devices(list.offset, list.limit).await?;
            let out = output::render_list(
                global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let found = dashboard.get_device(DeviceId(device)).await?;
            print_device(&found, global);
            Ok(())
        }

        DevicesCommand::Create {
            name,
            ip,
            kind,
            installed,
        } => {
            let date_installed = installed
                .as_deref()
                .map(|raw| util::parse_timestamp("installed", raw))
                .transpose()?;
            let created = dashboard
                .create_device(&DeviceCreate {
                    device_name: name,
                    ip_address: ip,
                    kind,
                    date_installed,
                })
                .await?;
            print_device(&created, global);
            Ok(())
        }

        DevicesCommand::Update {
            device,
            name,
            ip,
            kind,
        } => {
            let update = DeviceUpdate {
                device_name: name,
                ip_address: ip,
                kind,
                ..DeviceUpdate::default()
            };
            let updated = dashboard.update_device(DeviceId(device), &update).await?;
            print_device(&updated, global);
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            if !util::confirm(
                &format!("Delete device {device} and all of its readings?"),
                global.yes,
            )? {
                return Ok(());
            }
            dashboard.delete_device(DeviceId(device)).await?;
            if !global.quiet {
                eprintln!("Device {device} deleted");
            }
            Ok(())
        }
    }
}
