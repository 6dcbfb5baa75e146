// Wire types for the monitoring backend.
//
// Field names follow the backend's JSON exactly. Every response struct is
// tolerant of missing fields (`#[serde(default)]`) because the backend
// omits values it cannot read on a given board.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Which backend-side view a console endpoint reports on.
///
/// System info and network scans are served by the console backend for
/// both machines, distinguished by a `local_` / `remote_` path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    Local,
    Remote,
}

// ── Configuration ──────────────────────────────────────────────────

/// `GET /api/config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigResponse {
    pub monitor_target_host_set: bool,
    pub monitor_target_host: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub monitor_target_port: Option<String>,
}

/// Ports come back as either `"5000"` or `5000` depending on how the
/// backend read its environment.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ── System info ────────────────────────────────────────────────────

/// `GET /api/{scope}_system_info`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemInfo {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_total_gb: f64,
    pub memory_used_gb: f64,
    pub disk_percent: f64,
    pub disk_total_gb: f64,
    pub disk_used_gb: f64,
    pub uptime: String,
}

// ── Network ────────────────────────────────────────────────────────

/// One entry of `GET /api/{scope}_network_status` or `_scan`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkDevice {
    pub ip: String,
    pub mac: Option<String>,
    pub interface: Option<String>,
    pub name: Option<String>,
}

// ── GPU ────────────────────────────────────────────────────────────

/// `GET /api/jetson_gpu_info` — every field is individually nullable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GpuInfo {
    pub gpu_usage_percent: Option<f64>,
    pub gpu_clock_mhz: Option<f64>,
    pub gpu_percent: Option<f64>,
    pub emc_percent: Option<f64>,
    pub gpu_temp_c: Option<f64>,
    pub power_mw: Option<f64>,
    pub ram_usage_mb: Option<f64>,
    pub ram_total_mb: Option<f64>,
}

// ── Docker ─────────────────────────────────────────────────────────

/// One entry of `GET /api/docker_services`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerService {
    pub name: String,
    pub status: String,
    pub image: String,
    pub id: String,
}

impl DockerService {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

// ── Power mode ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PowerMode {
    pub id: u32,
    pub name: String,
}

/// `GET /api/power_mode`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PowerModeState {
    pub current_id: Option<u32>,
    pub current_name: Option<String>,
    pub modes: Vec<PowerMode>,
}

impl PowerModeState {
    pub fn mode_name(&self, id: u32) -> Option<&str> {
        self.modes
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.as_str())
    }
}

// ── Hardware sentinel ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FanState {
    pub speed: f64,
    pub profile: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SwapState {
    pub usage: f64,
    pub total_gb: f64,
    pub used_gb: f64,
}

/// `clocks` is a boolean when `jetson_clocks` state is known, otherwise
/// the raw status line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClockState {
    Flag(bool),
    Label(String),
}

impl Default for ClockState {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl ClockState {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Label(_) => None,
        }
    }
}

/// `GET /api/hardware_sentinel`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareSentinel {
    pub thermals: BTreeMap<String, f64>,
    pub fan: FanState,
    pub clocks: ClockState,
    pub swap: SwapState,
    pub timestamp: String,
}

// ── Operations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RebootKind {
    Hard,
    Soft,
}

#[derive(Debug, Serialize)]
pub(crate) struct RestartRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PowerModeRequest {
    pub mode_id: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RebootRequest {
    #[serde(rename = "type")]
    pub kind: RebootKind,
}

#[derive(Debug, Serialize)]
pub(crate) struct TurboRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct FanRequest<'a> {
    pub mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub prompt: &'a str,
}

/// Body returned by the operation endpoints on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionResponse {
    pub status: Option<String>,
    pub message: Option<String>,
}

/// `POST /api/chat`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatReply {
    pub response: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_port_accepts_number_and_string() {
        let a: ConfigResponse = serde_json::from_value(json!({
            "monitor_target_host_set": true,
            "monitor_target_host": "10.0.0.5",
            "monitor_target_port": 5000
        }))
        .unwrap();
        let b: ConfigResponse = serde_json::from_value(json!({
            "monitor_target_host_set": true,
            "monitor_target_host": "10.0.0.5",
            "monitor_target_port": "5000"
        }))
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.monitor_target_port.as_deref(), Some("5000"));
    }

    #[test]
    fn config_blank_port_is_none() {
        let cfg: ConfigResponse = serde_json::from_value(json!({
            "monitor_target_host_set": false,
            "monitor_target_host": null,
            "monitor_target_port": ""
        }))
        .unwrap();
        assert!(cfg.monitor_target_port.is_none());
    }

    #[test]
    fn clocks_accept_bool_or_label() {
        let s: HardwareSentinel = serde_json::from_value(json!({ "clocks": true })).unwrap();
        assert_eq!(s.clocks.as_flag(), Some(true));

        let s: HardwareSentinel =
            serde_json::from_value(json!({ "clocks": "unavailable" })).unwrap();
        assert_eq!(s.clocks.as_flag(), None);
    }

    #[test]
    fn reboot_request_uses_type_field() {
        let body = serde_json::to_value(RebootRequest {
            kind: RebootKind::Soft,
        })
        .unwrap();
        assert_eq!(body, json!({ "type": "soft" }));
    }

    #[test]
    fn scope_renders_as_path_prefix() {
        assert_eq!(Scope::Local.as_ref(), "local");
        assert_eq!(Scope::Remote.to_string(), "remote");
    }
}
