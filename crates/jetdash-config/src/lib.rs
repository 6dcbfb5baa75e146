//! Shared configuration for the jetdash CLI.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `jetdash_core::ConsoleConfig`. Core never reads files; the CLI adds
//! flag-aware wrappers on top of this crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jetdash_core::{ArrivalPolicy, ConsoleConfig, OperationTimeouts, PollIntervals, TlsMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named console profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named console profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Console backend base URL (e.g., "http://127.0.0.1:5000").
    pub console_url: String,

    /// Override insecure TLS setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Poll cadences as human durations ("5s", "1m").
    #[serde(default)]
    pub intervals: IntervalOverrides,

    /// Operation timeouts as human durations.
    #[serde(default)]
    pub operations: TimeoutOverrides,

    /// Substrings naming the console's own service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_services: Option<Vec<String>>,

    /// Interface labels treated as low fidelity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_interfaces: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_policy: Option<ArrivalPolicy>,
}

impl Profile {
    pub fn new(console_url: impl Into<String>) -> Self {
        Self {
            console_url: console_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntervalOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_sentinel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_fast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_deep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_services: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl IntervalOverrides {
    fn apply(&self, base: PollIntervals) -> Result<PollIntervals, ConfigError> {
        Ok(PollIntervals {
            system_info: duration("intervals.system_info", self.system_info.as_deref(), base.system_info)?,
            gpu_info: duration("intervals.gpu_info", self.gpu_info.as_deref(), base.gpu_info)?,
            hardware_sentinel: duration(
                "intervals.hardware_sentinel",
                self.hardware_sentinel.as_deref(),
                base.hardware_sentinel,
            )?,
            network_fast: duration("intervals.network_fast", self.network_fast.as_deref(), base.network_fast)?,
            network_deep: duration("intervals.network_deep", self.network_deep.as_deref(), base.network_deep)?,
            docker_services: duration(
                "intervals.docker_services",
                self.docker_services.as_deref(),
                base.docker_services,
            )?,
            power_mode: duration("intervals.power_mode", self.power_mode.as_deref(), base.power_mode)?,
            burst: duration("intervals.burst", self.burst.as_deref(), base.burst)?,
            config: duration("intervals.config", self.config.as_deref(), base.config)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reboot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan: Option<String>,
}

impl TimeoutOverrides {
    fn apply(&self, base: OperationTimeouts) -> Result<OperationTimeouts, ConfigError> {
        Ok(OperationTimeouts {
            restart_service: duration(
                "operations.restart_service",
                self.restart_service.as_deref(),
                base.restart_service,
            )?,
            power_mode: duration("operations.power_mode", self.power_mode.as_deref(), base.power_mode)?,
            reboot: duration("operations.reboot", self.reboot.as_deref(), base.reboot)?,
            turbo: duration("operations.turbo", self.turbo.as_deref(), base.turbo)?,
            fan: duration("operations.fan", self.fan.as_deref(), base.fan)?,
        })
    }
}

/// Parse a human duration, keeping `fallback` when unset. Zero is rejected.
fn duration(field: &str, value: Option<&str>, fallback: Duration) -> Result<Duration, ConfigError> {
    let Some(raw) = value else {
        return Ok(fallback);
    };
    let parsed = humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}': {e}"),
    })?;
    if parsed.is_zero() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(parsed)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "jetdash", "jetdash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("jetdash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment keys use `JETDASH_` and `__` as the nesting separator,
/// e.g. `JETDASH_PROFILES__LAB__CONSOLE_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("JETDASH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ConsoleConfig` from a profile and global defaults. No CLI
/// flag overrides; the CLI layers those on top.
pub fn profile_to_console_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile
        .console_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "console_url".into(),
            reason: format!("invalid URL: {}", profile.console_url),
        })?;

    let mut cfg = ConsoleConfig::new(url);

    cfg.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else {
        TlsMode::System
    };
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.intervals = profile.intervals.apply(cfg.intervals)?;
    cfg.operations = profile.operations.apply(cfg.operations)?;

    if let Some(ref services) = profile.self_services {
        cfg.self_services.clone_from(services);
    }
    if let Some(ref labels) = profile.generic_interfaces {
        cfg.generic_interfaces.clone_from(labels);
    }
    if let Some(policy) = profile.arrival_policy {
        cfg.arrival_policy = policy;
    }

    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "lab"

[profiles.lab]
console_url = "http://10.0.0.2:5000"
timeout = 4
arrival_policy = "newest-issued"
self_services = ["jetdash"]

[profiles.lab.intervals]
system_info = "2s"
network_deep = "5m"

[profiles.lab.operations]
reboot = "10m"
"#;

    fn write(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_profile_and_translates() {
        let (_dir, path) = write(SAMPLE);
        let cfg = load_config_from(&path).unwrap();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "lab");

        let console = profile_to_console_config(profile, &cfg.defaults).unwrap();
        assert_eq!(console.console_url.as_str(), "http://10.0.0.2:5000/");
        assert_eq!(console.timeout, Duration::from_secs(4));
        assert_eq!(console.arrival_policy, ArrivalPolicy::NewestIssued);
        assert_eq!(console.self_services, vec!["jetdash".to_owned()]);
        assert_eq!(console.intervals.system_info, Duration::from_secs(2));
        assert_eq!(console.intervals.network_deep, Duration::from_secs(300));
        assert_eq!(console.intervals.gpu_info, PollIntervals::default().gpu_info);
        assert_eq!(console.operations.reboot, Duration::from_secs(600));
        assert_eq!(console.tls, TlsMode::System);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            cfg.profile(None),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn bad_duration_is_a_validation_error() {
        let mut profile = Profile::new("http://127.0.0.1:5000");
        profile.intervals.burst = Some("soon".into());
        let err = profile_to_console_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "intervals.burst"));

        profile.intervals.burst = Some("0s".into());
        assert!(profile_to_console_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn bad_url_is_rejected() {
        let profile = Profile::new("not a url");
        let err = profile_to_console_config(&profile, &Defaults::default()).unwrap_err();
        assert!(err.to_string().contains("console_url"));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("http://127.0.0.1:5000");
        profile.insecure = Some(true);
        cfg.profiles.insert("default".into(), profile);
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.console_url, "http://127.0.0.1:5000");
        let console = profile_to_console_config(profile, &loaded.defaults).unwrap();
        assert_eq!(console.tls, TlsMode::DangerAcceptInvalid);
    }
}
