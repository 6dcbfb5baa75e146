// ── State-changing operations ──
//
// Identity, confirmation predicates and lifecycle events for operations
// whose effect is only visible through later polls.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::snapshot::Source;
use super::target::TargetKind;

/// Operation identity: one pending operation per (target, entity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationKey {
    pub target: TargetKind,
    pub entity: String,
}

impl OperationKey {
    pub fn new(target: TargetKind, entity: impl Into<String>) -> Self {
        Self {
            target,
            entity: entity.into(),
        }
    }

    pub fn service(target: TargetKind, name: &str) -> Self {
        Self::new(target, format!("service:{name}"))
    }

    pub fn reboot(target: TargetKind) -> Self {
        Self::new(target, "reboot")
    }

    pub fn power_mode(target: TargetKind) -> Self {
        Self::new(target, "power-mode")
    }

    pub fn turbo(target: TargetKind) -> Self {
        Self::new(target, "turbo")
    }

    pub fn fan(target: TargetKind) -> Self {
        Self::new(target, "fan")
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target, self.entity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    RestartService,
    SetPowerMode,
    Reboot,
    SetTurbo,
    SetFan,
}

/// What a later poll must report for the operation to count as done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "until", rename_all = "snake_case")]
pub enum Confirmation {
    /// Docker service listed with status `running`.
    ServiceRunning { name: String },
    /// Power mode `current_id` equals the requested id.
    PowerMode { mode_id: u32 },
    /// System info failed at least once, then answered again.
    Recovered { observed_outage: bool },
    /// Sentinel reports clocks locked (or not) as requested.
    Turbo { enabled: bool },
    /// Sentinel fan mode equals the requested mode.
    Fan { mode: String },
}

impl Confirmation {
    /// The source whose polls can confirm this predicate.
    pub fn source(&self) -> Source {
        match self {
            Self::ServiceRunning { .. } => Source::DockerServices,
            Self::PowerMode { .. } => Source::PowerMode,
            Self::Recovered { .. } => Source::SystemInfo,
            Self::Turbo { .. } | Self::Fan { .. } => Source::HardwareSentinel,
        }
    }
}

/// A requested operation that is neither confirmed, failed nor timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingOperation {
    pub key: OperationKey,
    pub kind: OperationKind,
    #[serde(skip)]
    pub started_at: Instant,
    pub requested_at: DateTime<Utc>,
    pub timeout: Duration,
    pub confirmation: Confirmation,
    pub seq: u64,
    /// Failure of the initiating request is expected (the operation takes
    /// down the console's own backend) and does not fail the operation.
    pub self_referential: bool,
}

impl PendingOperation {
    pub fn deadline(&self) -> Instant {
        self.started_at + self.timeout
    }
}

/// Lifecycle transitions, broadcast as they happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OperationEvent {
    Requested {
        key: OperationKey,
        kind: OperationKind,
        seq: u64,
    },
    Confirmed {
        key: OperationKey,
        seq: u64,
    },
    Failed {
        key: OperationKey,
        seq: u64,
        message: String,
    },
    TimedOut {
        key: OperationKey,
        seq: u64,
    },
}

impl OperationEvent {
    pub fn key(&self) -> &OperationKey {
        match self {
            Self::Requested { key, .. }
            | Self::Confirmed { key, .. }
            | Self::Failed { key, .. }
            | Self::TimedOut { key, .. } => key,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Self::Requested { seq, .. }
            | Self::Confirmed { seq, .. }
            | Self::Failed { seq, .. }
            | Self::TimedOut { seq, .. } => *seq,
        }
    }

    /// True for every event that returns the key to idle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Requested { .. })
    }
}

impl fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested { key, kind, .. } => write!(f, "{key}: {kind} requested"),
            Self::Confirmed { key, .. } => write!(f, "{key}: confirmed"),
            Self::Failed { key, message, .. } => write!(f, "{key}: failed ({message})"),
            Self::TimedOut { key, .. } => write!(f, "{key}: timed out without confirmation"),
        }
    }
}
