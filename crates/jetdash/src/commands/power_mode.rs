//! `power-mode`: show or switch the nvpmodel mode.

use std::fmt::Write as _;

use jetdash_core::{Command, Console, PowerModeState};

use crate::cli::{GlobalOpts, PowerModeArgs, PowerModeCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Painter};

fn detail(state: &PowerModeState, p: Painter) -> String {
    let mut out = String::new();
    for mode in &state.modes {
        let current = state.current_id == Some(mode.id);
        let marker = if current { "*" } else { " " };
        let line = format!("{marker} {:>2}  {}", mode.id, mode.name);
        let _ = writeln!(out, "{}", if current { p.good(&line) } else { line });
    }
    if state.modes.is_empty() {
        let _ = writeln!(
            out,
            "current: {} ({})",
            output::opt(state.current_name.as_deref()),
            output::opt(state.current_id),
        );
    }
    out.trim_end().to_owned()
}

pub async fn handle(console: &Console, args: PowerModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        PowerModeCommand::Show { target } => {
            let kind = target.kind();
            util::start_console(console).await?;
            util::require_target(console, kind).await?;

            let state = util::scalar_data(
                console.store().subscribe_power_mode(kind),
                util::wait_limit(console),
                "power mode",
            )
            .await?;

            let painter = Painter::new(&global.color);
            let out = output::render_single(
                &global.output,
                &*state,
                |s| detail(s, painter),
                |s| output::opt(s.current_id),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PowerModeCommand::Set { id, target, wait } => {
            let cmd = Command::SetPowerMode {
                target: target.kind(),
                mode_id: id,
            };
            util::run_operation(console, cmd, wait.wait, global).await
        }
    }
}

#[cfg(test)]
mod tests {
    use jetdash_core::PowerMode;

    use super::*;

    #[test]
    fn current_mode_is_marked() {
        let state = PowerModeState {
            current_id: Some(0),
            current_name: Some("MAXN".into()),
            modes: vec![
                PowerMode {
                    id: 0,
                    name: "MAXN".into(),
                },
                PowerMode {
                    id: 1,
                    name: "15W".into(),
                },
            ],
        };
        let out = detail(&state, Painter::new(&crate::cli::ColorMode::Never));
        assert_eq!(out, "*  0  MAXN\n   1  15W");
    }
}
