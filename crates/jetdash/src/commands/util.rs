//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use jetdash_core::{
    Command, CommandResult, Console, OperationEvent, ScalarSnapshot, SnapshotStream, TargetKind,
    TargetStatus,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Extra time allowed past an operation's own timeout before the CLI
/// stops listening for its outcome.
const OUTCOME_SLACK: Duration = Duration::from_secs(2);

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// How long to wait for a first answer from the backend.
pub fn wait_limit(console: &Console) -> Duration {
    console.config().timeout.saturating_mul(2)
}

/// Start background polling.
pub async fn start_console(console: &Console) -> Result<(), CliError> {
    console.start().await?;
    Ok(())
}

/// Wait until `target` is resolved and make sure it is pollable.
pub async fn require_target(console: &Console, target: TargetKind) -> Result<(), CliError> {
    let limit = wait_limit(console);
    let status = tokio::time::timeout(limit, console.wait_resolved(target))
        .await
        .map_err(|_| CliError::WaitTimeout {
            what: format!("the {target} target to resolve"),
            seconds: limit.as_secs(),
        })??;

    match status {
        TargetStatus::Active { .. } => Ok(()),
        TargetStatus::ConfigError { message } => Err(CliError::TargetConfig { message }),
        TargetStatus::Resolving | TargetStatus::NotConfigured => Err(CliError::NotConfigured {
            target: target.to_string(),
        }),
    }
}

/// Wait for the first snapshot matching `ready`.
pub async fn first_ready<S>(
    mut stream: SnapshotStream<S>,
    ready: impl FnMut(&S) -> bool,
    limit: Duration,
    what: &str,
) -> Result<S, CliError>
where
    S: Clone + Send + Sync + 'static,
{
    tokio::time::timeout(limit, stream.wait_for(ready))
        .await
        .map_err(|_| CliError::WaitTimeout {
            what: what.into(),
            seconds: limit.as_secs(),
        })?
        .ok_or_else(|| CliError::from(jetdash_core::CoreError::Disconnected))
}

/// Wait for the first answer of a scalar source and return its payload.
pub async fn scalar_data<T>(
    stream: SnapshotStream<ScalarSnapshot<T>>,
    limit: Duration,
    what: &str,
) -> Result<std::sync::Arc<T>, CliError>
where
    T: Clone + Send + Sync + 'static,
{
    let snap = first_ready(stream, |s| !s.loading, limit, what).await?;
    match (snap.data, snap.error) {
        (Some(data), _) => Ok(data),
        (None, Some(message)) => Err(CliError::Backend { message }),
        (None, None) => Err(CliError::Backend {
            message: format!("No {what} reported"),
        }),
    }
}

// ── Operations ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OperationReport {
    key: String,
    seq: u64,
    outcome: String,
    message: Option<String>,
}

impl OperationReport {
    fn detail(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {} ({message})", self.key, self.outcome),
            None => format!("{}: {}", self.key, self.outcome),
        }
    }
}

/// Execute `cmd`, report the backend's answer and, with `wait`, follow the
/// operation until it is confirmed, fails or times out.
pub async fn run_operation(
    console: &Console,
    cmd: Command,
    wait: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    start_console(console).await?;
    require_target(console, cmd.target()).await?;

    // Subscribe before executing so no transition is missed.
    let mut events = console.events();
    let limit = console.config().operations.for_kind(cmd.kind()) + OUTCOME_SLACK;

    let result = console.execute(cmd).await?;
    let report = match &result {
        CommandResult::Accepted { key, seq, message } => OperationReport {
            key: key.to_string(),
            seq: *seq,
            outcome: "requested".into(),
            message: message.clone(),
        },
        CommandResult::Assumed { key, seq, reason } => OperationReport {
            key: key.to_string(),
            seq: *seq,
            outcome: "requested (connection dropped, as expected)".into(),
            message: Some(reason.clone()),
        },
    };
    tracing::debug!(key = %report.key, seq = report.seq, "operation requested");

    if !wait {
        let out = output::render_single(
            &global.output,
            &report,
            OperationReport::detail,
            |r| r.key.clone(),
        );
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let event = await_operation(&mut events, &result, limit).await?;
    let report = OperationReport {
        outcome: "confirmed".into(),
        ..report
    };
    tracing::debug!(%event, "operation settled");
    let out = output::render_single(
        &global.output,
        &report,
        OperationReport::detail,
        |r| r.key.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Follow `events` until the operation identified by `result` reaches a
/// terminal state. Only confirmation is success.
pub async fn await_operation(
    events: &mut broadcast::Receiver<OperationEvent>,
    result: &CommandResult,
    limit: Duration,
) -> Result<OperationEvent, CliError> {
    let key = result.key().clone();
    let seq = result.seq();

    let follow = async {
        loop {
            match events.recv().await {
                Ok(event) if event.is_terminal() && *event.key() == key && event.seq() == seq => {
                    return Ok(event);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "operation events lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(CliError::from(jetdash_core::CoreError::Disconnected));
                }
            }
        }
    };

    let event = tokio::time::timeout(limit, follow)
        .await
        .map_err(|_| CliError::OperationTimedOut {
            key: key.to_string(),
        })??;

    match event {
        OperationEvent::Confirmed { .. } => Ok(event),
        OperationEvent::Failed { message, .. } => Err(CliError::OperationFailed {
            key: key.to_string(),
            message,
        }),
        OperationEvent::TimedOut { .. } | OperationEvent::Requested { .. } => {
            Err(CliError::OperationTimedOut {
                key: key.to_string(),
            })
        }
    }
}
