// ── Snapshots ──
//
// Latest-known state per (target, source), as published by the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::device::DeviceInventory;

/// Error text shown for every source of an unconfigured remote target.
pub const NOT_CONFIGURED: &str = "Not configured";

/// The independently polled data sources of a target.
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
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    SystemInfo,
    NetworkFast,
    NetworkDeep,
    GpuInfo,
    DockerServices,
    PowerMode,
    HardwareSentinel,
}

impl Source {
    /// Sources that poll faster while an operation they confirm is pending.
    pub fn bursts(self) -> bool {
        matches!(
            self,
            Self::SystemInfo | Self::DockerServices | Self::PowerMode | Self::HardwareSentinel
        )
    }

    pub fn is_network(self) -> bool {
        matches!(self, Self::NetworkFast | Self::NetworkDeep)
    }
}

// ── ScalarSnapshot ──────────────────────────────────────────────────

/// Latest result of one scalar source. Once `loading` is false exactly
/// one of `data` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> ScalarSnapshot<T> {
    pub fn loading() -> Self {
        Self {
            data: None,
            error: None,
            loading: true,
            updated_at: None,
        }
    }

    pub fn not_configured() -> Self {
        Self {
            data: None,
            error: Some(NOT_CONFIGURED.into()),
            loading: false,
            updated_at: None,
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            loading: false,
            updated_at: None,
        }
    }

    pub fn ok(data: T, at: DateTime<Utc>) -> Self {
        Self {
            data: Some(Arc::new(data)),
            error: None,
            loading: false,
            updated_at: Some(at),
        }
    }

    /// Failed poll. Stale data is dropped.
    pub fn failed(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            loading: false,
            updated_at: Some(at),
        }
    }
}

// ── InventorySnapshot ───────────────────────────────────────────────

/// Device inventory of one target. Unlike scalars, `devices` and `error`
/// may both be present: a failed fast scan keeps the last good inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySnapshot {
    pub devices: Arc<DeviceInventory>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_fast: Option<DateTime<Utc>>,
    pub last_deep: Option<DateTime<Utc>>,
}

impl InventorySnapshot {
    pub fn loading() -> Self {
        Self {
            devices: Arc::new(DeviceInventory::new()),
            error: None,
            loading: true,
            last_fast: None,
            last_deep: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            loading: false,
            ..Self::loading()
        }
    }
}
