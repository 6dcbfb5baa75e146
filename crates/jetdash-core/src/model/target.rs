// ── Monitored targets ──
//
// A target is one observed machine. The local target is always present;
// the remote one exists only when the console backend names a host.

use serde::{Deserialize, Serialize};

use jetdash_api::Scope;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetKind {
    Local,
    Remote,
}

impl TargetKind {
    pub const ALL: [TargetKind; 2] = [TargetKind::Local, TargetKind::Remote];

    /// Path prefix used by the console backend for this target.
    pub fn scope(self) -> Scope {
        match self {
            Self::Local => Scope::Local,
            Self::Remote => Scope::Remote,
        }
    }
}

/// Resolved configuration for one target.
///
/// Immutable for the lifetime of a polling generation; a change of address
/// or port produces a new value and a new generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub address: Option<String>,
    pub port: Option<String>,
    pub configured: bool,
}

impl Target {
    pub fn local() -> Self {
        Self {
            kind: TargetKind::Local,
            address: None,
            port: None,
            configured: true,
        }
    }

    pub fn remote(address: impl Into<String>, port: Option<String>) -> Self {
        Self {
            kind: TargetKind::Remote,
            address: Some(address.into()),
            port,
            configured: true,
        }
    }

    pub fn unconfigured_remote() -> Self {
        Self {
            kind: TargetKind::Remote,
            address: None,
            port: None,
            configured: false,
        }
    }

    /// `address[:port]` for display, `None` for the local target.
    pub fn endpoint(&self) -> Option<String> {
        let address = self.address.as_deref()?;
        Some(match self.port.as_deref() {
            Some(port) => format!("{address}:{port}"),
            None => address.to_owned(),
        })
    }
}

/// Both targets as one value, handed to whatever needs to route requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSet {
    pub local: Target,
    pub remote: Target,
}

impl Default for TargetSet {
    fn default() -> Self {
        Self {
            local: Target::local(),
            remote: Target::unconfigured_remote(),
        }
    }
}

impl TargetSet {
    pub fn get(&self, kind: TargetKind) -> &Target {
        match kind {
            TargetKind::Local => &self.local,
            TargetKind::Remote => &self.remote,
        }
    }
}

/// What the configuration gate currently knows about the remote target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateState {
    pub configured: bool,
    pub address: Option<String>,
    pub port: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl GateState {
    pub fn loading() -> Self {
        Self {
            configured: false,
            address: None,
            port: None,
            loading: true,
            error: None,
        }
    }

    /// The remote target this state describes.
    pub fn remote_target(&self) -> Target {
        match (&self.address, self.configured) {
            (Some(address), true) => Target::remote(address.clone(), self.port.clone()),
            _ => Target::unconfigured_remote(),
        }
    }
}

/// Lifecycle of a target's polling, as seen by presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetStatus {
    /// Waiting for the first configuration answer.
    Resolving,
    NotConfigured,
    ConfigError { message: String },
    Active { generation: u64 },
}

impl TargetStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}
