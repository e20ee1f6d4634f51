//! Subprocess helpers shared by the tools and backends.
//!
//! Commands run as an argv vector; no shell is ever involved.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

/// Failures launching or waiting on a subprocess.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The executable does not exist.
    #[error("command not found: {0}")]
    NotFound(String),

    /// The process could not be spawned or awaited.
    #[error("failed to run {program}: {message}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        message: String,
    },

    /// The process did not exit within the limit and was killed.
    #[error("{program} timed out after {secs}s")]
    Timeout {
        /// Program name.
        program: String,
        /// Limit in whole seconds.
        secs: u64,
    },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Raw standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// True when the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Standard output as lossy UTF-8.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error as lossy UTF-8.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `program` with `args`, optionally feeding `stdin`, and wait for it.
///
/// The child is killed if `timeout` elapses first.
///
/// # Errors
///
/// Returns [`ExecError::NotFound`] when the executable is missing,
/// [`ExecError::Timeout`] on expiry and [`ExecError::Spawn`] otherwise.
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
    stdin: Option<&[u8]>,
) -> Result<CommandOutput, ExecError> {
    run(program, args, None, timeout, stdin).await
}

/// Like [`run_command`], with `cwd` as the working directory and no stdin.
///
/// # Errors
///
/// Same as [`run_command`].
pub async fn run_command_in(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    run(program, args, Some(cwd), timeout, None).await
}

async fn run(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
    stdin: Option<&[u8]>,
) -> Result<CommandOutput, ExecError> {
    let mut cmd = tokio::process::Command::new(program);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| spawn_error(program, &e))?;

    // Feed stdin while output is collected, or a child that fills its
    // stdout pipe before reading all input never finishes.
    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe)
            && let Err(e) = pipe.write_all(input).await
        {
            tracing::warn!(program, error = %e, "child stopped reading stdin");
        }
    };
    let finished = async {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    match tokio::time::timeout(timeout, finished).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }),
        Ok(Err(e)) => Err(spawn_error(program, &e)),
        // Dropping the future drops the child, and kill_on_drop reaps it.
        Err(_) => {
            tracing::warn!(program, secs = timeout.as_secs(), "subprocess timed out");
            Err(ExecError::Timeout {
                program: program.to_owned(),
                secs: timeout.as_secs(),
            })
        }
    }
}

/// Launch `program` without waiting for it. A background task reaps the
/// child when it exits; its handle is returned. Must be called inside a
/// Tokio runtime.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned.
pub fn spawn_detached(program: &str, args: &[String]) -> Result<JoinHandle<()>, ExecError> {
    let mut child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;
    let name = program.to_owned();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => tracing::debug!(program = %name, %status, "detached process exited"),
            Err(e) => tracing::warn!(program = %name, error = %e, "failed to reap detached process"),
        }
    }))
}

fn spawn_error(program: &str, err: &std::io::Error) -> ExecError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ExecError::NotFound(program.to_owned())
    } else {
        ExecError::Spawn {
            program: program.to_owned(),
            message: err.to_string(),
        }
    }
}
