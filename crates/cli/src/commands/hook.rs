use crate::context::{GlobalArgs, Session};
use deployenv_config::{CommandArgs, FileFormat, RunOptions};
use deployenv_core::{IoResultExt, Result};
use deployenv_env::LifecyclePhase;
use std::path::PathBuf;

pub async fn execute(
    global: &GlobalArgs,
    phase: &str,
    write: bool,
    output: Option<PathBuf>,
    command: Option<String>,
    args: Option<String>,
) -> Result<()> {
    let phase: LifecyclePhase = phase.parse()?;

    let mut options = global.plugin_options();
    if command.is_some() {
        options = options.with_run(RunOptions {
            command,
            args: args.map(CommandArgs::Line).unwrap_or_default(),
            stage: None,
        });
    }

    let mut session = Session::initialized(global, options).await?;
    session
        .plugin
        .handle_hook(phase, &mut session.descriptor)
        .await?;

    if !phase.publishes() {
        return Ok(());
    }

    let target = if write {
        Some(session.descriptor_path.clone())
    } else {
        output
    };

    match target {
        Some(path) => {
            let rendered = session.descriptor.render(FileFormat::from_path(&path))?;
            std::fs::write(&path, rendered).for_path(&path, "write")?;
            tracing::info!(path = %path.display(), hook = %phase, "descriptor updated");
        }
        None => {
            let format = FileFormat::from_path(&session.descriptor_path);
            emit(&session.descriptor.render(format)?);
        }
    }
    Ok(())
}

pub fn list() {
    for phase in LifecyclePhase::ALL {
        println!("{phase}");
    }
}

pub(crate) fn emit(text: &str) {
    if text.is_empty() {
        return;
    }
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
}
