//! Ad-hoc command execution under a resolved environment
//!
//! `<command> <args>` is run through the platform shell with the overlay
//! applied. Every line the command writes is logged as
//! `[COMMAND OUTPUT]: <line>`.

use crate::publisher::EnvironmentOverlay;
use deployenv_config::CommandArgs;
use deployenv_core::{Error, Result, COMMAND_OUTPUT_PREFIX};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// What a finished command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// The full shell line for `command` and `args`
#[must_use]
pub fn command_line(command: &str, args: &CommandArgs) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{command} {}", args.as_line())
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

/// Run `command` with `args` under `overlay`, failing on a non-zero exit
pub async fn run_with_environment(
    command: &str,
    args: &CommandArgs,
    overlay: &EnvironmentOverlay,
) -> Result<CommandOutput> {
    let line = command_line(command, args);
    let shown_args = if args.is_empty() {
        Vec::new()
    } else {
        vec![args.as_line()]
    };
    let fail = |message: String, code: Option<i32>| {
        Error::command_execution(command, shown_args.clone(), message, code)
    };

    tracing::debug!(command = %line, vars = overlay.vars().len(), "running command");

    let mut cmd = shell_command(&line);
    overlay.apply(&mut cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| fail(format!("Failed to spawn command: {e}"), None))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| fail("Failed to capture stdout".to_string(), None))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| fail("Failed to capture stderr".to_string(), None))?;

    let (stdout, stderr) = tokio::try_join!(log_lines(stdout), log_lines(stderr))
        .map_err(|e| fail(format!("Failed to read command output: {e}"), None))?;

    let status = child
        .wait()
        .await
        .map_err(|e| fail(format!("Failed to wait for command: {e}"), None))?;

    let exit_code = status.code().unwrap_or(1);
    if !status.success() {
        let message = stderr
            .last()
            .cloned()
            .unwrap_or_else(|| format!("exited with {status}"));
        return Err(fail(message, status.code()));
    }

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
    })
}

async fn log_lines<R>(reader: R) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut collected = Vec::new();
    while let Some(mut raw) = segments.next_segment().await? {
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        // Output is not required to be UTF-8
        let line = String::from_utf8_lossy(&raw).into_owned();
        tracing::info!("{COMMAND_OUTPUT_PREFIX}: {line}");
        collected.push(line);
    }
    Ok(collected)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use deployenv_core::EnvironmentVariables;

    fn overlay(pairs: &[(&str, &str)]) -> EnvironmentOverlay {
        EnvironmentOverlay::new(pairs.iter().copied().collect::<EnvironmentVariables>(), true)
    }

    #[test]
    fn test_command_line() {
        assert_eq!(command_line("npm test", &CommandArgs::default()), "npm test");
        assert_eq!(
            command_line("npm", &CommandArgs::Line("run lint -- --fix".into())),
            "npm run lint -- --fix"
        );
    }

    #[tokio::test]
    async fn test_resolved_values_visible() {
        let output = run_with_environment(
            "echo",
            &CommandArgs::Line("\"$GREETING\"".into()),
            &overlay(&[("GREETING", "hello")]),
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_inherits_parent_environment() {
        let output = run_with_environment(
            "test -n \"$PATH\" && echo ok",
            &CommandArgs::default(),
            &overlay(&[]),
        )
        .await
        .unwrap();
        assert_eq!(output.stdout, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_multiline_output_and_stderr() {
        let output = run_with_environment(
            "printf 'one\\ntwo\\n'; echo oops >&2",
            &CommandArgs::default(),
            &overlay(&[]),
        )
        .await
        .unwrap();
        assert_eq!(output.stdout, vec!["one", "two"]);
        assert_eq!(output.stderr, vec!["oops"]);
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_decoded_lossily() {
        let output = run_with_environment(
            "printf 'ok\\n\\377\\n'",
            &CommandArgs::default(),
            &overlay(&[]),
        )
        .await
        .unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, vec!["ok".to_string(), "\u{FFFD}".to_string()]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let err = run_with_environment(
            "echo broken >&2; exit 3",
            &CommandArgs::default(),
            &overlay(&[]),
        )
        .await
        .unwrap_err();

        match err {
            Error::CommandExecution {
                exit_code, message, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(message, "broken");
            }
            other => panic!("expected CommandExecution, got {other:?}"),
        }
    }
}
