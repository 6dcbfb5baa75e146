//! `sentinel`: thermals, fan, clocks and swap.

use std::fmt::Write as _;

use jetdash_core::{ClockState, Command, Console, HardwareSentinel};

use crate::cli::{GlobalOpts, SentinelArgs, SentinelCommand, Toggle};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Painter};

/// Thermal zones at or above this are highlighted.
const HOT_C: f64 = 70.0;

pub fn clock_label(clocks: &ClockState) -> String {
    match clocks {
        ClockState::Flag(true) => "pinned".into(),
        ClockState::Flag(false) => "dynamic".into(),
        ClockState::Label(raw) => raw.clone(),
    }
}

fn detail(s: &HardwareSentinel, p: Painter) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", p.heading("thermals"));
    for (zone, temp) in &s.thermals {
        let value = format!("{temp:.1} C");
        let value = if *temp >= HOT_C { p.bad(&value) } else { value };
        let _ = writeln!(out, "  {zone:<12}{value}");
    }
    let _ = writeln!(out, "{}", p.heading("fan"));
    let _ = writeln!(
        out,
        "  {:<12}{}\n  {:<12}{:.0}%\n  {:<12}{}",
        "mode", s.fan.mode, "speed", s.fan.speed, "profile", s.fan.profile
    );
    let _ = writeln!(out, "{}", p.heading("clocks"));
    let _ = writeln!(out, "  {}", clock_label(&s.clocks));
    let _ = writeln!(out, "{}", p.heading("swap"));
    let _ = writeln!(
        out,
        "  {:.1}% ({:.1}/{:.1} GB)",
        s.swap.usage, s.swap.used_gb, s.swap.total_gb
    );
    if !s.timestamp.is_empty() {
        let _ = writeln!(out, "{}", p.dim(&format!("as of {}", s.timestamp)));
    }
    out.trim_end().to_owned()
}

pub async fn handle(console: &Console, args: SentinelArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SentinelCommand::Show { target } => {
            let kind = target.kind();
            util::start_console(console).await?;
            util::require_target(console, kind).await?;

            let sentinel = util::scalar_data(
                console.store().subscribe_hardware_sentinel(kind),
                util::wait_limit(console),
                "hardware sentinel",
            )
            .await?;

            let painter = Painter::new(&global.color);
            let out = output::render_single(
                &global.output,
                &*sentinel,
                |s| detail(s, painter),
                super::status::sentinel_line,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SentinelCommand::Turbo {
            state,
            target,
            wait,
        } => {
            let cmd = Command::SetTurbo {
                target: target.kind(),
                enabled: matches!(state, Toggle::On),
            };
            util::run_operation(console, cmd, wait.wait, global).await
        }

        SentinelCommand::Fan {
            mode,
            speed,
            target,
            wait,
        } => {
            if speed.is_some_and(|s| s > 100) {
                return Err(CliError::Validation {
                    field: "speed".into(),
                    reason: "must be between 0 and 100".into(),
                });
            }
            let cmd = Command::SetFan {
                target: target.kind(),
                mode,
                speed,
            };
            util::run_operation(console, cmd, wait.wait, global).await
        }
    }
}
