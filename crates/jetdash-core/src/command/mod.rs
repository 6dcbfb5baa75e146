// ── Command API ──
//
// Every state-changing operation flows through the `Command` enum. The
// console tracks each one as pending, routes it to the target's backend,
// and lets later polls confirm it.

use crate::config::OperationTimeouts;
use crate::error::CoreError;
use crate::model::{Confirmation, OperationKey, OperationKind, RebootKind, TargetKind};
use crate::pending::OperationRequest;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All state-changing operations against a monitored machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RestartService {
        target: TargetKind,
        name: String,
    },
    SetPowerMode {
        target: TargetKind,
        mode_id: u32,
    },
    Reboot {
        target: TargetKind,
        kind: RebootKind,
    },
    SetTurbo {
        target: TargetKind,
        enabled: bool,
    },
    SetFan {
        target: TargetKind,
        mode: String,
        speed: Option<u32>,
    },
}

impl Command {
    pub fn target(&self) -> TargetKind {
        match self {
            Self::RestartService { target, .. }
            | Self::SetPowerMode { target, .. }
            | Self::Reboot { target, .. }
            | Self::SetTurbo { target, .. }
            | Self::SetFan { target, .. } => *target,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::RestartService { .. } => OperationKind::RestartService,
            Self::SetPowerMode { .. } => OperationKind::SetPowerMode,
            Self::Reboot { .. } => OperationKind::Reboot,
            Self::SetTurbo { .. } => OperationKind::SetTurbo,
            Self::SetFan { .. } => OperationKind::SetFan,
        }
    }

    pub fn key(&self) -> OperationKey {
        let target = self.target();
        match self {
            Self::RestartService { name, .. } => OperationKey::service(target, name),
            Self::SetPowerMode { .. } => OperationKey::power_mode(target),
            Self::Reboot { .. } => OperationKey::reboot(target),
            Self::SetTurbo { .. } => OperationKey::turbo(target),
            Self::SetFan { .. } => OperationKey::fan(target),
        }
    }

    pub fn confirmation(&self) -> Confirmation {
        match self {
            Self::RestartService { name, .. } => Confirmation::ServiceRunning { name: name.clone() },
            Self::SetPowerMode { mode_id, .. } => Confirmation::PowerMode { mode_id: *mode_id },
            Self::Reboot { .. } => Confirmation::Recovered {
                observed_outage: false,
            },
            Self::SetTurbo { enabled, .. } => Confirmation::Turbo { enabled: *enabled },
            Self::SetFan { mode, .. } => Confirmation::Fan { mode: mode.clone() },
        }
    }

    pub(crate) fn to_request(&self, timeouts: &OperationTimeouts) -> OperationRequest {
        OperationRequest {
            key: self.key(),
            kind: self.kind(),
            confirmation: self.confirmation(),
            timeout: timeouts.for_kind(self.kind()),
        }
    }
}

/// Result of a command that was accepted for tracking.
///
/// Completion is reported later through `OperationEvent`s carrying the
/// same key and seq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The backend acknowledged the request.
    Accepted {
        key: OperationKey,
        seq: u64,
        message: Option<String>,
    },
    /// The request failed the way a self-referential operation is
    /// expected to; the operation stays pending.
    Assumed {
        key: OperationKey,
        seq: u64,
        reason: String,
    },
}

impl CommandResult {
    pub fn key(&self) -> &OperationKey {
        match self {
            Self::Accepted { key, .. } | Self::Assumed { key, .. } => key,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Self::Accepted { seq, .. } | Self::Assumed { seq, .. } => *seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_identity() {
        let cmd = Command::RestartService {
            target: TargetKind::Remote,
            name: "api".into(),
        };
        assert_eq!(cmd.key().to_string(), "remote/service:api");
        assert_eq!(cmd.kind(), OperationKind::RestartService);
        assert_eq!(cmd.confirmation().source(), crate::model::Source::DockerServices);
    }

    #[test]
    fn request_uses_kind_timeout() {
        let timeouts = OperationTimeouts::default();
        let cmd = Command::Reboot {
            target: TargetKind::Local,
            kind: RebootKind::Soft,
        };
        assert_eq!(cmd.to_request(&timeouts).timeout, timeouts.reboot);
    }
}
