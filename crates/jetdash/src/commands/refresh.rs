use std::time::Duration;

use serde::Serialize;

use jetdash_core::{Console, Source, TargetKind};

use crate::cli::{GlobalOpts, RefreshArgs};
use crate::commands::status::ConsoleView;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

/// Time given to the reconciler to apply the outcome before reading back.
const APPLY_GRACE: Duration = Duration::from_millis(100);

#[derive(Serialize)]
struct RefreshReport {
    target: TargetKind,
    source: Source,
    error: Option<String>,
}

fn source_error(view: &ConsoleView, target: TargetKind, source: Source) -> Option<String> {
    let t = match target {
        TargetKind::Local => &view.local,
        TargetKind::Remote => &view.remote,
    };
    match source {
        Source::SystemInfo => t.system_info.error.clone(),
        Source::GpuInfo => t.gpu_info.error.clone(),
        Source::DockerServices => t.docker_services.error.clone(),
        Source::PowerMode => t.power_mode.error.clone(),
        Source::HardwareSentinel => t.hardware_sentinel.error.clone(),
        Source::NetworkFast | Source::NetworkDeep => t.inventory.error.clone(),
    }
}

pub async fn handle(console: &Console, args: RefreshArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = args.target.kind();
    util::start_console(console).await?;
    util::require_target(console, target).await?;

    console.refresh(target, args.source).await?;
    tokio::time::sleep(APPLY_GRACE).await;

    let view = ConsoleView::collect(console.store());
    let report = RefreshReport {
        target,
        source: args.source,
        error: source_error(&view, target, args.source),
    };
    let line = |r: &RefreshReport| match &r.error {
        Some(error) => format!("{}/{}: {error}", r.target, r.source),
        None => format!("{}/{}: ok", r.target, r.source),
    };
    let out = output::render_single(&global.output, &report, line, line);
    output::print_output(&out, global.quiet);
    Ok(())
}
