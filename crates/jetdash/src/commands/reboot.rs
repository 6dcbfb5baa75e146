use jetdash_core::{Command, Console, RebootKind};

use crate::cli::{GlobalOpts, RebootArgs};
use crate::commands::util;
use crate::error::CliError;

pub async fn handle(console: &Console, args: RebootArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = args.target.kind();
    let kind = if args.hard {
        RebootKind::Hard
    } else {
        RebootKind::Soft
    };

    let prompt = format!("{kind} reboot of the {target} target?");
    if !util::confirm("reboot", &prompt, global.yes)? {
        return Ok(());
    }

    util::run_operation(console, Command::Reboot { target, kind }, args.wait.wait, global).await
}
