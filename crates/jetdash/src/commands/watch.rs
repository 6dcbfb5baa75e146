//! `watch`: keep polling and redraw until Ctrl-C.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::IsTerminal;

use tokio::sync::broadcast::error::RecvError;

use jetdash_core::{Console, OperationEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::commands::status::{self, ConsoleView};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Painter};

/// Operation transitions kept under the view.
const RECENT_EVENTS: usize = 8;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub async fn handle(console: &Console, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::start_console(console).await?;

    let painter = Painter::new(&global.color);
    let clear = matches!(global.output, OutputFormat::Table) && std::io::stdout().is_terminal();
    let mut events = console.events();
    let mut recent: VecDeque<OperationEvent> = VecDeque::with_capacity(RECENT_EVENTS);

    let mut ticker = tokio::time::interval(args.every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if recent.len() == RECENT_EVENTS {
                        recent.pop_front();
                    }
                    recent.push_back(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "operation events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => {
                let view = ConsoleView::collect(console.store());
                let mut frame = output::render_single(
                    &global.output,
                    &view,
                    |v| status::render_detail(v, painter),
                    status::plain_summary,
                );
                if matches!(global.output, OutputFormat::Table) && !recent.is_empty() {
                    let _ = writeln!(frame, "\n{}", painter.heading("recent"));
                    for event in &recent {
                        let _ = writeln!(frame, "  {event}");
                    }
                }
                if clear {
                    print!("{CLEAR_SCREEN}");
                }
                output::print_output(frame.trim_end(), global.quiet);
            }
        }
    }

    Ok(())
}
