//! Host shell execution for completions accepted as commands.

use std::io;
use std::process::{Command, ExitStatus};

/// Run `command_text` through the host shell with inherited stdio. The exit
/// status is reported back but the caller is not expected to inspect it.
pub fn run_shell(command_text: &str) -> io::Result<ExitStatus> {
    let status = shell_command(command_text).status()?;
    tracing::debug!(%status, "shell command finished");
    Ok(status)
}

#[cfg(unix)]
fn shell_command(command_text: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_text);
    command
}

#[cfg(windows)]
fn shell_command(command_text: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", command_text]);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::run_shell;

    #[test]
    fn successful_command_reports_success_status() {
        let status = run_shell("true").expect("command should launch");
        assert!(status.success());
    }

    #[test]
    fn failing_command_reports_failure_status_without_error() {
        let status = run_shell("false").expect("command should launch");
        assert!(!status.success());
    }

    #[test]
    fn command_text_is_interpreted_by_the_shell() {
        let status = run_shell("test 2 -gt 1").expect("command should launch");
        assert!(status.success());
    }
}
