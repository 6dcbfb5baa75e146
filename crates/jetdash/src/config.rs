//! CLI configuration: thin wrapper around `jetdash_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--console, --timeout, etc.).

use std::time::Duration;

use jetdash_core::{ConsoleConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use jetdash_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ConsoleConfig` from the config file, profile, and CLI overrides.
///
/// Flags take priority over profile values. Without a profile, `--console`
/// alone is enough.
pub fn build_console_config(global: &GlobalOpts) -> Result<ConsoleConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut console = match (cfg.profiles.get(&profile_name), global.console.as_deref()) {
        (Some(profile), _) => jetdash_config::profile_to_console_config(profile, &cfg.defaults)?,
        (None, Some(url)) => jetdash_config::profile_to_console_config(&Profile::new(url), &cfg.defaults)?,
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    // 1. Console URL (flag > env > profile)
    if let Some(url_str) = global.console.as_deref() {
        console.console_url = url_str.parse().map_err(|_| CliError::Validation {
            field: "console".into(),
            reason: format!("invalid URL: {url_str}"),
        })?;
    }

    // 2. TLS verification
    if global.insecure {
        console.tls = TlsMode::DangerAcceptInvalid;
    }

    // 3. Timeout
    if let Some(secs) = global.timeout {
        console.timeout = Duration::from_secs(secs);
    }

    Ok(console)
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
