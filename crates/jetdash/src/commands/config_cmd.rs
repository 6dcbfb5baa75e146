//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Take `value` if given, otherwise prompt for it on a terminal.
fn value_or_prompt(value: Option<String>, flag: &str, prompt: &str, default: &str) -> Result<String, CliError> {
    if let Some(value) = value {
        return Ok(value);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: flag.into(),
            reason: format!("--{flag} is required when not running interactively"),
        });
    }
    Input::<String>::new()
        .with_prompt(prompt)
        .default(default.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        // ── Init: create or extend ─────────────────────────────────
        ConfigCommand::Init { name, url } => {
            let name = value_or_prompt(name, "name", "Profile name", "default")?;
            let url = value_or_prompt(url, "url", "Console backend URL", "http://127.0.0.1:5000")?;

            if url.parse::<url::Url>().is_err() {
                return Err(CliError::Validation {
                    field: "url".into(),
                    reason: format!("invalid URL: {url}"),
                });
            }

            let mut cfg = config::load_config()?;
            let first = cfg.profiles.is_empty();
            cfg.profiles.insert(name.clone(), Profile::new(url));
            if first {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", path.display());
                if first {
                    eprintln!("  Active profile: {name}");
                }
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: jetdash config init");
            } else {
                let lines: Vec<String> = cfg
                    .profiles
                    .iter()
                    .map(|(name, p)| {
                        let marker = if name == default { " *" } else { "" };
                        format!("{name}{marker}\t{}", p.console_url)
                    })
                    .collect();
                output::print_output(&lines.join("\n"), global.quiet);
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
