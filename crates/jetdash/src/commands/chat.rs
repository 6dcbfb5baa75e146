use serde::Serialize;

use jetdash_core::Console;

use crate::cli::{ChatArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ChatView {
    prompt: String,
    response: String,
}

/// Passthrough to the backend assistant. No polling needed.
pub async fn handle(console: &Console, args: ChatArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err(CliError::Validation {
            field: "prompt".into(),
            reason: "must not be empty".into(),
        });
    }

    let response = console.chat(&prompt).await?;
    let view = ChatView { prompt, response };
    let out = output::render_single(
        &global.output,
        &view,
        |v| v.response.clone(),
        |v| v.response.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
