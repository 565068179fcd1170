// Subprocess helpers shared by adapters

use std::process::{Output, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::ExtractError;

/// Run `program` with `args`, collecting stdout/stderr, killing it after `timeout_secs`.
///
/// The child is also killed when the returned future is dropped, so a cancelled
/// request never leaves a stray extractor process behind.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<Output, ExtractError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::ToolNotFound(format!("{}: {}", program, e))
            } else {
                ExtractError::Execution(format!("Failed to start {}: {}", program, e))
            }
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        ExtractError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        ExtractError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    let read_stdout = async {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    };

    let waited = timeout(Duration::from_secs(timeout_secs), async {
        tokio::join!(read_stdout, read_stderr, child.wait())
    })
    .await;

    match waited {
        Ok((stdout, stderr, status)) => {
            let status = status.map_err(|e| {
                ExtractError::Execution(format!("Failed to wait for {}: {}", program, e))
            })?;
            let stdout = stdout
                .map_err(|e| ExtractError::Execution(format!("Failed to read stdout: {}", e)))?;
            let stderr = stderr
                .map_err(|e| ExtractError::Execution(format!("Failed to read stderr: {}", e)))?;
            Ok(Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            Err(ExtractError::Timeout(timeout_secs))
        }
    }
}

/// First line of `program --version`, if the program runs at all
pub async fn tool_version(program: &str) -> Option<String> {
    let output = run_output_with_timeout(program, &["--version".to_string()], 10)
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}
