//! Command dispatch: routes parsed CLI commands to their handlers.

pub mod chat;
pub mod config_cmd;
pub mod devices;
pub mod power_mode;
pub mod reboot;
pub mod refresh;
pub mod sentinel;
pub mod services;
pub mod status;
pub mod util;
pub mod watch;

use jetdash_core::Console;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend command to the appropriate handler.
pub async fn dispatch(cmd: Command, console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(console, args, global).await,
        Command::Watch(args) => watch::handle(console, args, global).await,
        Command::Devices(args) => devices::handle(console, args, global).await,
        Command::Services(args) => services::handle(console, args, global).await,
        Command::PowerMode(args) => power_mode::handle(console, args, global).await,
        Command::Reboot(args) => reboot::handle(console, args, global).await,
        Command::Sentinel(args) => sentinel::handle(console, args, global).await,
        Command::Refresh(args) => refresh::handle(console, args, global).await,
        Command::Chat(args) => chat::handle(console, args, global).await,
        // Handled in main before a console is built
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
