// ── Runtime console configuration ──
//
// Describes which backend to talk to and how often to poll it. Built by
// the CLI from a config profile and handed to `Console`; core never
// reads config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use jetdash_api::TlsMode;

use crate::merge::DEFAULT_GENERIC_INTERFACES;
use crate::model::{OperationKind, Source};

/// Service names whose restart takes down the console's own backend.
pub const DEFAULT_SELF_SERVICES: &[&str] = &["jetdash", "web_monitor", "web-monitor"];

/// How poll outcomes for the same (target, source) are ordered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ArrivalPolicy {
    /// Apply every outcome as it arrives; a slow older response can
    /// overwrite a newer one.
    #[default]
    LastArrived,
    /// Drop outcomes issued before the last applied one.
    NewestIssued,
}

/// Poll period per source, plus the burst period used while an operation
/// is waiting on that source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollIntervals {
    pub system_info: Duration,
    pub gpu_info: Duration,
    pub hardware_sentinel: Duration,
    pub network_fast: Duration,
    pub network_deep: Duration,
    pub docker_services: Duration,
    pub power_mode: Duration,
    pub burst: Duration,
    /// Re-query period for the remote target configuration.
    pub config: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            system_info: Duration::from_secs(5),
            gpu_info: Duration::from_secs(5),
            hardware_sentinel: Duration::from_secs(5),
            network_fast: Duration::from_secs(30),
            network_deep: Duration::from_secs(60),
            docker_services: Duration::from_secs(60),
            power_mode: Duration::from_secs(30),
            burst: Duration::from_secs(3),
            config: Duration::from_secs(60),
        }
    }
}

impl PollIntervals {
    pub fn period(&self, source: Source) -> Duration {
        match source {
            Source::SystemInfo => self.system_info,
            Source::NetworkFast => self.network_fast,
            Source::NetworkDeep => self.network_deep,
            Source::GpuInfo => self.gpu_info,
            Source::DockerServices => self.docker_services,
            Source::PowerMode => self.power_mode,
            Source::HardwareSentinel => self.hardware_sentinel,
        }
    }
}

/// How long each kind of operation may stay pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub restart_service: Duration,
    pub power_mode: Duration,
    pub reboot: Duration,
    pub turbo: Duration,
    pub fan: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            restart_service: Duration::from_secs(60),
            power_mode: Duration::from_secs(60),
            reboot: Duration::from_secs(300),
            turbo: Duration::from_secs(30),
            fan: Duration::from_secs(30),
        }
    }
}

impl OperationTimeouts {
    pub fn for_kind(&self, kind: OperationKind) -> Duration {
        match kind {
            OperationKind::RestartService => self.restart_service,
            OperationKind::SetPowerMode => self.power_mode,
            OperationKind::Reboot => self.reboot,
            OperationKind::SetTurbo => self.turbo,
            OperationKind::SetFan => self.fan,
        }
    }
}

/// Configuration for one console instance.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Console backend URL (e.g., `http://127.0.0.1:5000`).
    pub console_url: Url,
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    pub intervals: PollIntervals,
    pub operations: OperationTimeouts,
    /// Case-insensitive substrings identifying the console's own service.
    pub self_services: Vec<String>,
    /// Interface labels treated as low fidelity by the merger.
    pub generic_interfaces: Vec<String>,
    pub arrival_policy: ArrivalPolicy,
}

impl ConsoleConfig {
    pub fn new(console_url: Url) -> Self {
        Self {
            console_url,
            tls: TlsMode::default(),
            timeout: Duration::from_secs(10),
            intervals: PollIntervals::default(),
            operations: OperationTimeouts::default(),
            self_services: DEFAULT_SELF_SERVICES.iter().map(|s| (*s).to_owned()).collect(),
            generic_interfaces: DEFAULT_GENERIC_INTERFACES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            arrival_policy: ArrivalPolicy::default(),
        }
    }
}
