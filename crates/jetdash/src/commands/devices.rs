//! `devices`: the merged LAN inventory of one target.

use tabled::Tabled;

use jetdash_core::{Console, DeviceRecord, MacKey};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(d: &DeviceRecord) -> Self {
        Self {
            mac: d.mac.to_string(),
            ip: if d.ip.is_empty() { "-".into() } else { d.ip.clone() },
            interface: d.interface.clone(),
            name: output::opt(d.name.as_deref()),
        }
    }
}

fn device_id(d: &DeviceRecord) -> String {
    match &d.mac {
        MacKey::Known(mac) => mac.to_string(),
        MacKey::Unknown => d.ip.clone(),
    }
}

pub async fn handle(console: &Console, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = args.target.kind();
    util::start_console(console).await?;
    util::require_target(console, kind).await?;

    let deep = args.deep;
    let limit = if deep {
        console.config().intervals.network_deep + util::wait_limit(console)
    } else {
        util::wait_limit(console)
    };
    let snap = util::first_ready(
        console.store().subscribe_inventory(kind),
        |s| !s.loading && (!deep || s.last_deep.is_some() || s.error.is_some()),
        limit,
        "the device inventory",
    )
    .await?;

    if let Some(error) = &snap.error {
        if snap.devices.is_empty() {
            return Err(CliError::Backend {
                message: error.clone(),
            });
        }
        tracing::warn!(%error, "latest scan failed; showing last known devices");
    }

    let out = output::render_list(
        &global.output,
        snap.devices.records(),
        |d| DeviceRow::from(d),
        device_id,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
