use crate::context::{GlobalArgs, Session};
use deployenv_config::{CommandArgs, RunOptions};
use deployenv_core::Result;

pub async fn execute(
    global: &GlobalArgs,
    command: String,
    stage: Option<String>,
    args: Option<String>,
) -> Result<()> {
    let run = RunOptions {
        command: Some(command),
        args: args.map(CommandArgs::Line).unwrap_or_default(),
        stage,
    };

    // The run stage is resolved on demand, so no initialization pass is needed
    let session = Session::open(global, global.plugin_options().with_run(run.clone()))?;
    let output = session.plugin.run_with_environment(&run).await?;

    tracing::debug!(
        exit_code = output.exit_code,
        lines = output.stdout.len() + output.stderr.len(),
        "command finished"
    );
    Ok(())
}
