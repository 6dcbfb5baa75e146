//! `status`: one consolidated view of both targets.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use jetdash_core::{
    Console, DataStore, DockerService, GateState, GpuInfo, HardwareSentinel, InventorySnapshot,
    PendingOperation, PowerModeState, ScalarSnapshot, SystemInfo, Target, TargetKind,
    TargetStatus,
};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Painter, opt_f64};

// ── View model ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TargetView {
    pub target: Target,
    pub status: TargetStatus,
    pub system_info: ScalarSnapshot<SystemInfo>,
    pub gpu_info: ScalarSnapshot<GpuInfo>,
    pub docker_services: ScalarSnapshot<Vec<DockerService>>,
    pub power_mode: ScalarSnapshot<PowerModeState>,
    pub hardware_sentinel: ScalarSnapshot<HardwareSentinel>,
    pub inventory: InventorySnapshot,
}

impl TargetView {
    fn collect(store: &DataStore, kind: TargetKind) -> Self {
        Self {
            target: store.targets().get(kind).clone(),
            status: store.target_status(kind),
            system_info: store.system_info(kind),
            gpu_info: store.gpu_info(kind),
            docker_services: store.docker_services(kind),
            power_mode: store.power_mode(kind),
            hardware_sentinel: store.hardware_sentinel(kind),
            inventory: store.inventory(kind),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleView {
    pub gate: GateState,
    pub local: TargetView,
    pub remote: TargetView,
    pub pending: Arc<Vec<PendingOperation>>,
}

impl ConsoleView {
    pub fn collect(store: &DataStore) -> Self {
        Self {
            gate: store.gate(),
            local: TargetView::collect(store, TargetKind::Local),
            remote: TargetView::collect(store, TargetKind::Remote),
            pending: store.pending(),
        }
    }

    fn targets(&self) -> [(TargetKind, &TargetView); 2] {
        [
            (TargetKind::Local, &self.local),
            (TargetKind::Remote, &self.remote),
        ]
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::start_console(console).await?;

    if !console.wait_settled(Duration::from_secs(args.wait)).await {
        tracing::warn!(wait = args.wait, "some sources have not answered yet");
    }

    let view = ConsoleView::collect(console.store());
    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| render_detail(v, painter),
        plain_summary,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────

/// One line per target: `<kind> <state>`.
pub fn plain_summary(view: &ConsoleView) -> String {
    view.targets()
        .iter()
        .map(|(kind, t)| format!("{kind} {}", status_word(&t.status)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_word(status: &TargetStatus) -> String {
    match status {
        TargetStatus::Resolving => "resolving".into(),
        TargetStatus::NotConfigured => "not-configured".into(),
        TargetStatus::ConfigError { .. } => "config-error".into(),
        TargetStatus::Active { generation } => format!("active#{generation}"),
    }
}

pub fn render_detail(view: &ConsoleView, p: Painter) -> String {
    let mut out = String::new();
    for (kind, t) in view.targets() {
        let title = match t.target.endpoint() {
            Some(endpoint) => format!("{kind} ({endpoint})"),
            None => kind.to_string(),
        };
        let state = match &t.status {
            TargetStatus::Active { .. } => p.good(&status_word(&t.status)),
            TargetStatus::Resolving => p.dim("resolving"),
            TargetStatus::NotConfigured => p.dim("not configured"),
            TargetStatus::ConfigError { message } => p.bad(&format!("config error: {message}")),
        };
        let _ = writeln!(out, "{}  [{state}]", p.heading(&title));

        if !t.status.is_active() && !matches!(t.status, TargetStatus::Resolving) {
            continue;
        }

        row(&mut out, p, "System", &t.system_info, system_line);
        row(&mut out, p, "GPU", &t.gpu_info, gpu_line);
        row(&mut out, p, "Docker", &t.docker_services, |s| docker_line(s, p));
        row(&mut out, p, "Power", &t.power_mode, power_line);
        row(&mut out, p, "Sentinel", &t.hardware_sentinel, sentinel_line);
        let _ = writeln!(out, "  {:<9}{}", "Devices", inventory_line(&t.inventory, p));
    }

    if !view.pending.is_empty() {
        let _ = writeln!(out, "{}", p.heading("pending"));
        for op in view.pending.iter() {
            let _ = writeln!(
                out,
                "  {:<28}{:<16}{}",
                op.key.to_string(),
                op.kind.to_string(),
                p.dim(&format!("since {}", op.requested_at.format("%H:%M:%S"))),
            );
        }
    }

    out.trim_end().to_owned()
}

fn row<T>(
    out: &mut String,
    p: Painter,
    label: &str,
    snap: &ScalarSnapshot<T>,
    line: impl Fn(&T) -> String,
) {
    let text = match (&snap.data, &snap.error) {
        (Some(data), _) => format!("{}{}", line(data), age(snap.updated_at, p)),
        (None, Some(error)) => p.bad(error),
        (None, None) if snap.loading => p.dim("loading"),
        (None, None) => p.dim("-"),
    };
    let _ = writeln!(out, "  {label:<9}{text}");
}

fn age(at: Option<DateTime<Utc>>, p: Painter) -> String {
    let Some(at) = at else {
        return String::new();
    };
    let secs = (Utc::now() - at).num_seconds().max(0);
    p.dim(&format!("  ({secs}s ago)"))
}

fn system_line(s: &SystemInfo) -> String {
    format!(
        "cpu {:.1}%  mem {:.1}% ({:.1}/{:.1} GB)  disk {:.1}% ({:.1}/{:.1} GB)  up {}",
        s.cpu_percent,
        s.memory_percent,
        s.memory_used_gb,
        s.memory_total_gb,
        s.disk_percent,
        s.disk_used_gb,
        s.disk_total_gb,
        s.uptime,
    )
}

fn gpu_line(g: &GpuInfo) -> String {
    format!(
        "load {}%  clock {} MHz  temp {} C  power {} mW",
        opt_f64(g.gpu_usage_percent.or(g.gpu_percent)),
        opt_f64(g.gpu_clock_mhz),
        opt_f64(g.gpu_temp_c),
        opt_f64(g.power_mw),
    )
}

fn docker_line(services: &[DockerService], p: Painter) -> String {
    let running = services.iter().filter(|s| s.is_running()).count();
    let summary = format!("{running}/{} running", services.len());
    if running == services.len() {
        p.good(&summary)
    } else {
        p.warn(&summary)
    }
}

fn power_line(state: &PowerModeState) -> String {
    match (&state.current_name, state.current_id) {
        (Some(name), Some(id)) => format!("{name} (mode {id})"),
        (None, Some(id)) => state
            .mode_name(id)
            .map_or_else(|| format!("mode {id}"), |name| format!("{name} (mode {id})")),
        (Some(name), None) => name.clone(),
        (None, None) => "unknown".into(),
    }
}

pub fn sentinel_line(s: &HardwareSentinel) -> String {
    let hottest = s
        .thermals
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or_else(|| "-".into(), |(zone, t)| format!("{zone} {t:.1} C"));
    format!(
        "hottest {hottest}  fan {} {:.0}%  clocks {}",
        s.fan.mode,
        s.fan.speed,
        super::sentinel::clock_label(&s.clocks),
    )
}

fn inventory_line(inv: &InventorySnapshot, p: Painter) -> String {
    let mut line = if inv.loading && inv.devices.is_empty() {
        p.dim("loading")
    } else {
        format!("{} known", inv.devices.len())
    };
    if let Some(error) = &inv.error {
        let _ = write!(line, "  {}", p.bad(error));
    }
    if inv.last_deep.is_none() && !inv.loading && inv.error.is_none() {
        let _ = write!(line, "  {}", p.dim("(no deep scan yet)"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painter() -> Painter {
        Painter::new(&crate::cli::ColorMode::Never)
    }

    #[test]
    fn fresh_store_renders_both_targets_resolving() {
        let store = DataStore::new();
        let view = ConsoleView::collect(&store);
        assert_eq!(plain_summary(&view), "local resolving\nremote resolving");
        let detail = render_detail(&view, painter());
        assert!(detail.contains("local  [resolving]"));
        assert!(detail.contains("System   loading"));
    }

    #[test]
    fn power_line_falls_back_to_mode_table() {
        let state = PowerModeState {
            current_id: Some(1),
            current_name: None,
            modes: vec![jetdash_core::PowerMode {
                id: 1,
                name: "15W".into(),
            }],
        };
        assert_eq!(power_line(&state), "15W (mode 1)");
    }

    #[test]
    fn stopped_services_are_counted() {
        let svc = |name: &str, status: &str| DockerService {
            name: name.into(),
            status: status.into(),
            ..DockerService::default()
        };
        let line = docker_line(&[svc("api", "running"), svc("web", "exited")], painter());
        assert_eq!(line, "1/2 running");
    }
}
