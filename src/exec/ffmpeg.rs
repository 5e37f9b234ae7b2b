//! Process orchestration for one ffmpeg invocation.
//!
//! One child process per call, stdin closed, stdout captured as the output
//! image, stderr captured for diagnostics. A wall-clock timeout kills the
//! child and rejects; exit conditions are classified into the error
//! taxonomy. No pooling or reuse.

use crate::config::RenderConfig;
use crate::foundation::error::{FfrenderError, FfrenderResult};
use anyhow::Context as _;
use std::io::Read as _;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Poll interval while waiting for the child under the timeout.
const WAIT_POLL: Duration = Duration::from_millis(5);

/// Spawn the configured ffmpeg with `args`, enforce the configured timeout,
/// and return the captured stdout bytes on success.
///
/// Classification: a launch failure whose cause is "executable not found"
/// becomes [`FfrenderError::ToolNotFound`] naming the resolved path; timeout
/// expiry kills the child and becomes [`FfrenderError::Timeout`]; a non-zero
/// exit becomes [`FfrenderError::Process`] with the exit code and stderr
/// text.
pub fn run_ffmpeg(config: &RenderConfig, args: &[String]) -> FfrenderResult<Vec<u8>> {
    let bin = config.resolve_ffmpeg_bin();

    if config.log_command {
        tracing::info!(command = %format!("{} {}", bin.display(), args.join(" ")), "spawning ffmpeg");
    }

    let mut cmd = Command::new(&bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(FfrenderError::ToolNotFound {
                path: bin.to_string_lossy().into_owned(),
            });
        }
        Err(err) => {
            return Err(
                anyhow::Error::new(err)
                    .context(format!("failed to spawn '{}'", bin.display()))
                    .into(),
            );
        }
    };

    // Drain both pipes on threads so a chatty child can never fill a pipe
    // buffer and deadlock against our wait loop.
    let mut stdout = child
        .stdout
        .take()
        .context("failed to open ffmpeg stdout (unexpected)")?;
    let mut stderr = child
        .stderr
        .take()
        .context("failed to open ffmpeg stderr (unexpected)")?;
    let stdout_drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stdout.read_to_end(&mut bytes).map(|_| bytes)
    });
    let stderr_drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes).map(|_| bytes)
    });

    let status = match wait_with_timeout(&mut child, config.timeout) {
        Ok(status) => status,
        Err(err) => {
            // Timeout or wait failure: make sure the child is gone before
            // reporting, so the temp cleanup that follows cannot race a
            // still-running process.
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
    };

    let stdout_bytes = join_drain(stdout_drain, "stdout")?;
    let stderr_bytes = join_drain(stderr_drain, "stderr")?;

    if status.success() {
        return Ok(stdout_bytes);
    }

    let stderr_text = String::from_utf8_lossy(&stderr_bytes).trim().to_owned();
    Err(FfrenderError::Process {
        code: status.code().unwrap_or(-1),
        stderr: if stderr_text.is_empty() {
            "unknown error".to_owned()
        } else {
            stderr_text
        },
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> FfrenderResult<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return Err(FfrenderError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                std::thread::sleep(WAIT_POLL);
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context("failed to wait for ffmpeg")
                    .into());
            }
        }
    }
}

fn join_drain(
    handle: std::thread::JoinHandle<std::io::Result<Vec<u8>>>,
    stream: &str,
) -> FfrenderResult<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("ffmpeg {stream} drain thread panicked"))?
        .with_context(|| format!("ffmpeg {stream} read failed"))
        .map_err(Into::into)
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt as _;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut Command) {}
