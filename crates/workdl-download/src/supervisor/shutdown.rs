//! Graceful shutdown for the fetch subprocess with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Stop a child, escalating to a forced kill after `grace`.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to `grace` for the process to exit
/// 2. If still running, kill it
/// 3. Wait for reaping
///
/// On Windows there is no SIGTERM equivalent and the child is killed at once.
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped
        return child.wait().await;
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "child PID out of range"))?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    tracing::debug!(target: "workdl.download", pid, "Fetch tool ignored SIGTERM, killing");
    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_terminates_sleeping_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let started = Instant::now();
        let status = shutdown_child(&mut child, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("trap '' TERM; sleep 30")
            .spawn()
            .unwrap();
        // Give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        let status = shutdown_child(&mut child, Duration::from_millis(300))
            .await
            .unwrap();
        assert!(!status.success());
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_already_exited_child() {
        let mut child = Command::new("true").spawn().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = shutdown_child(&mut child, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(status.code().is_some());
    }
}
