//! `services`: docker services on a target.

use tabled::Tabled;

use jetdash_core::{Command, Console, DockerService};

use crate::cli::{GlobalOpts, ServicesArgs, ServicesCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&DockerService> for ServiceRow {
    fn from(s: &DockerService) -> Self {
        Self {
            name: s.name.clone(),
            status: s.status.clone(),
            image: s.image.clone(),
            id: s.id.chars().take(12).collect(),
        }
    }
}

pub async fn handle(console: &Console, args: ServicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ServicesCommand::List { target } => {
            let kind = target.kind();
            util::start_console(console).await?;
            util::require_target(console, kind).await?;

            let services = util::scalar_data(
                console.store().subscribe_docker_services(kind),
                util::wait_limit(console),
                "docker services",
            )
            .await?;

            let out = output::render_list(
                &global.output,
                services.as_slice(),
                |s| ServiceRow::from(s),
                |s| s.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServicesCommand::Restart { name, target, wait } => {
            let cmd = Command::RestartService {
                target: target.kind(),
                name,
            };
            util::run_operation(console, cmd, wait.wait, global).await
        }
    }
}
