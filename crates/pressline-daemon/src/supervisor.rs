// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spawns and supervises the discovery and LPD mini-daemons (§4.7): each
// child's stdout is fed through `pressline_ipc::FrameDecoder`, each child's
// stderr is relayed line-by-line through `pressline_ipc::log_daemon_line`.

use std::path::PathBuf;
use std::process::Stdio;

use pressline_core::PresslineContext;
use pressline_ipc::FrameDecoder;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::warn;

/// A spawned mini-daemon and the tasks draining its pipes.
pub struct Supervised {
    name: &'static str,
    child: Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl Supervised {
    /// Terminate the child and wait for its pipe-draining tasks to finish.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(daemon = self.name, error = %e, "failed to signal mini-daemon");
        }
        let _ = self.child.wait().await;
        let _ = self.stdout_task.await;
        let _ = self.stderr_task.await;
    }
}

/// Locate a sibling binary next to the currently running executable, falling
/// back to a bare name (resolved via `PATH`) if the executable's own
/// directory can't be determined.
fn sibling_binary(name: &str) -> PathBuf {
    match std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(name))) {
        Some(path) if path.exists() => path,
        _ => PathBuf::from(name),
    }
}

fn spawn_with_pipes(name: &'static str, mut command: Command) -> std::io::Result<Supervised> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stdout_task = tokio::spawn(async move {
        let mut reader = stdout;
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    for message in decoder.feed(&buf[..n]) {
                        tracing::debug!(daemon = name, groups = message.groups.len(), "mini-daemon frame received");
                    }
                }
                Err(e) => {
                    warn!(daemon = name, error = %e, "error reading mini-daemon stdout");
                    break;
                }
            }
        }
    });

    let stderr = child.stderr.take().expect("stderr was piped");
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => pressline_ipc::log_daemon_line(name, &line),
                Ok(None) => break,
                Err(e) => {
                    warn!(daemon = name, error = %e, "error reading mini-daemon stderr");
                    break;
                }
            }
        }
    });

    Ok(Supervised {
        name,
        child,
        stdout_task,
        stderr_task,
    })
}

/// Spawn the `pressline-deviced` mini-daemon with the `cups-deviced` ABI
/// argv (§4.5/§6): `request-id limit timeout user-id options`.
pub fn spawn_discovery(ctx: &PresslineContext) -> std::io::Result<Supervised> {
    let mut command = Command::new(sibling_binary("pressline-deviced"));
    command
        .arg("1") // request-id
        .arg("0") // limit: unbounded
        .arg("30") // timeout seconds
        .arg(&ctx.default_user)
        .arg("") // options
        .env("TMPDIR", &ctx.tmp_dir);
    spawn_with_pipes("pressline-deviced", command)
}

/// Spawn the `pressline-lpd` mini-daemon, pointed at this process's own IPP
/// surface.
pub fn spawn_lpd(ctx: &PresslineContext) -> std::io::Result<Supervised> {
    let mut command = Command::new(sibling_binary("pressline-lpd"));
    command
        .env("LPD_PORT", "515")
        .env(
            "PRESSLINE_SCHEDULER_URI",
            format!("ipp://127.0.0.1:{}/printers/lp", ctx.ipp_port),
        )
        .env("TMPDIR", &ctx.tmp_dir);
    spawn_with_pipes("pressline-lpd", command)
}
