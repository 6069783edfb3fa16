//! Subprocess execution for scheduler commands.

use crate::error::BridgeError;
use std::time::Duration;
use tokio::process::Command;

/// Run a scheduler command and return its stdout.
///
/// The wait is bounded by `timeout`; scheduler tools can hang when the
/// controller is unreachable. sacctmgr reports some failures on stdout
/// with stderr empty, so on a non-zero exit whichever stream has content
/// becomes the error message.
pub async fn run(cmd: &mut Command, name: &str, timeout: Duration) -> Result<String, BridgeError> {
    tracing::debug!("Running {}: {:?}", name, cmd.as_std());

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| BridgeError::Timeout {
            command: name.to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|e| BridgeError::Launch {
            command: name.to_string(),
            error: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        return Err(BridgeError::Failed {
            command: name.to_string(),
            message: message.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run sacctmgr with the machine-readable flags every invocation needs.
pub(crate) async fn run_sacctmgr(
    args: &[String],
    timeout: Duration,
) -> Result<String, BridgeError> {
    let mut cmd = Command::new("sacctmgr");
    cmd.args(args).args(["--parsable2", "--noheader"]);
    run(&mut cmd, "sacctmgr", timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let out = run(&mut cmd, "echo", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let mut cmd = Command::new("sacctl_no_such_binary");
        let err = run(&mut cmd, "missing", Duration::from_secs(5)).await;
        assert!(matches!(err, Err(BridgeError::Launch { .. })));
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_prefers_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let err = run(&mut cmd, "sh", Duration::from_secs(5)).await;
        match err {
            Err(BridgeError::Failed { message, .. }) => assert_eq!(message, "err"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run(&mut cmd, "sleep", Duration::from_millis(50)).await;
        assert!(matches!(err, Err(BridgeError::Timeout { .. })));
    }
}
